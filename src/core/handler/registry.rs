// src/core/handler/registry.rs

//! The command-keyed handler table, built once at startup.

use super::backend::IlsBackend;
use super::commands::{CheckinHandler, EndPatronSessionHandler, ForwardHandler, LoginHandler, ScStatusHandler};
use crate::connection::SessionState;
use crate::core::GatewayError;
use crate::core::protocol::{Command, Request, Response};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Executes one kind of request.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        request: Request,
        session: &mut SessionState,
    ) -> Result<Response, GatewayError>;
}

/// Maps every request command to its handler.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<Command, Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<_> = self.handlers.keys().map(|c| c.slug()).collect();
        commands.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("commands", &commands)
            .finish()
    }
}

impl HandlerRegistry {
    /// The standard table: SC Status and End Patron Session are answered
    /// locally, Login and Checkin add session logic, everything else is
    /// forwarded to `backend` unchanged.
    pub fn new(backend: Arc<dyn IlsBackend>) -> Self {
        let mut registry = Self::default();
        registry.register(Command::ScStatus, Arc::new(ScStatusHandler));
        registry.register(Command::EndPatronSession, Arc::new(EndPatronSessionHandler));
        registry.register(Command::Login, Arc::new(LoginHandler::new(backend.clone())));
        registry.register(Command::Checkin, Arc::new(CheckinHandler::new(backend.clone())));

        // Request ACS Resend is answered by the connection itself.
        let forwarded = Arc::new(ForwardHandler::new(backend));
        for command in Command::iter().filter(|c| c.is_request() && *c != Command::RequestAcsResend) {
            if !registry.handlers.contains_key(&command) {
                registry.register(command, forwarded.clone());
            }
        }
        registry
    }

    /// Installs or replaces the handler for `command`.
    pub fn register(&mut self, command: Command, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(command, handler);
    }

    pub fn get(&self, command: Command) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&command).cloned()
    }

    /// Runs the handler registered for the request's command.
    pub async fn dispatch(
        &self,
        request: Request,
        session: &mut SessionState,
    ) -> Result<Response, GatewayError> {
        let command = request.command();
        let handler = self
            .get(command)
            .ok_or(GatewayError::NoHandler(command))?;
        handler.handle(request, session).await
    }
}
