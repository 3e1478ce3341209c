// src/core/errors.rs

//! Defines the primary error type for the gateway.

use crate::core::protocol::Command;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all failures below the connection loop.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Frame exceeds the maximum length of {0} bytes")]
    FrameTooLong(usize),

    #[error("Frame too short: needed {needed} more characters at offset {offset}")]
    FrameTooShort { offset: usize, needed: usize },

    #[error("Missing field delimiter after offset {offset}")]
    MissingDelimiter { offset: usize },

    #[error("Checksum or sequence number mismatch")]
    ErrorDetection,

    #[error("Unknown command")]
    UnknownCommand,

    #[error("Command '{0}' cannot be sent by a self-check terminal")]
    UnsupportedCommand(Command),

    #[error("No handler registered for command '{0}'")]
    NoHandler(Command),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend request timed out")]
    BackendTimeout,

    #[error("Tenant resolution failed: {0}")]
    Resolution(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl PartialEq for GatewayError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GatewayError::Io(e1), GatewayError::Io(e2)) => e1.to_string() == e2.to_string(),
            (GatewayError::FrameTooLong(a), GatewayError::FrameTooLong(b)) => a == b,
            (
                GatewayError::FrameTooShort {
                    offset: o1,
                    needed: n1,
                },
                GatewayError::FrameTooShort {
                    offset: o2,
                    needed: n2,
                },
            ) => o1 == o2 && n1 == n2,
            (
                GatewayError::MissingDelimiter { offset: o1 },
                GatewayError::MissingDelimiter { offset: o2 },
            ) => o1 == o2,
            (GatewayError::UnsupportedCommand(c1), GatewayError::UnsupportedCommand(c2)) => {
                c1 == c2
            }
            (GatewayError::NoHandler(c1), GatewayError::NoHandler(c2)) => c1 == c2,
            (GatewayError::Backend(s1), GatewayError::Backend(s2)) => s1 == s2,
            (GatewayError::Resolution(s1), GatewayError::Resolution(s2)) => s1 == s2,
            (GatewayError::Config(s1), GatewayError::Config(s2)) => s1 == s2,
            (GatewayError::Internal(s1), GatewayError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl GatewayError {
    /// True for failures that only affect the current message; the peer is
    /// asked to resend and the connection stays open.
    pub fn is_message_scoped(&self) -> bool {
        matches!(
            self,
            GatewayError::FrameTooShort { .. }
                | GatewayError::MissingDelimiter { .. }
                | GatewayError::ErrorDetection
                | GatewayError::UnknownCommand
                | GatewayError::UnsupportedCommand(_)
        )
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Io(Arc::new(e))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::BackendTimeout
        } else {
            GatewayError::Backend(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Backend(format!("JSON serialization/deserialization error: {e}"))
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(e: url::ParseError) -> Self {
        GatewayError::Config(format!("invalid URL: {e}"))
    }
}
