// src/core/mod.rs

//! The central module containing the protocol, tenant and dispatch logic of
//! the gateway.

pub mod errors;
pub mod handler;
pub mod metrics;
pub mod protocol;
pub mod state;
pub mod tenant;

pub use errors::GatewayError;
pub use protocol::{Command, Request, Response};
