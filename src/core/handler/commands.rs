// src/core/handler/commands.rs

//! The per-command handlers.

use super::backend::{BackendCall, IlsBackend};
use super::registry::CommandHandler;
use crate::connection::{LoginCredentials, SessionState};
use crate::core::GatewayError;
use crate::core::protocol::messages::{
    AcsStatus, CheckinResponse, EndSessionResponse, ItemInformation, LoginResponse,
    PROTOCOL_VERSION,
};
use crate::core::protocol::types::StatusCode;
use crate::core::protocol::{Request, Response};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

async fn forward(
    backend: &dyn IlsBackend,
    request: &Request,
    session: &SessionState,
) -> Result<Response, GatewayError> {
    let call = BackendCall {
        tenant: session.tenant(),
        session: session.info(),
        request,
    };
    backend.call(call).await
}

fn unexpected(expected: &str, request: &Request) -> GatewayError {
    GatewayError::Internal(format!(
        "{expected} handler received a '{}' request",
        request.command()
    ))
}

/// Answers SC Status locally from the tenant's ACS settings.
#[derive(Debug, Default)]
pub struct ScStatusHandler;

#[async_trait]
impl CommandHandler for ScStatusHandler {
    async fn handle(
        &self,
        request: Request,
        session: &mut SessionState,
    ) -> Result<Response, GatewayError> {
        let Request::ScStatus(status) = request else {
            return Err(unexpected("sc-status", &request));
        };
        if status.status_code == Some(StatusCode::ShuttingDown) {
            info!("SC in session {} reports it is shutting down.", session.session_id);
        }
        session.max_print_width = status.max_print_width;
        session.sc_protocol_version = Some(status.protocol_version);

        let s = &session.settings;
        Ok(Response::AcsStatus(AcsStatus {
            online_status: true,
            checkin_ok: s.checkin_ok,
            checkout_ok: s.checkout_ok,
            acs_renewal_policy: s.renewal_policy,
            status_update_ok: s.status_update_ok,
            offline_ok: s.offline_ok,
            timeout_period: s.timeout_period,
            retries_allowed: s.retries_allowed,
            date_time_sync: Utc::now().fixed_offset(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            institution_id: s.institution_id.clone(),
            library_name: s.library_name.clone(),
            supported_messages: s.supported_messages,
            terminal_location: s.terminal_location.clone(),
            screen_message: Vec::new(),
            print_line: Vec::new(),
        }))
    }
}

/// Ends the patron session locally, forgetting the patron's credentials.
#[derive(Debug, Default)]
pub struct EndPatronSessionHandler;

#[async_trait]
impl CommandHandler for EndPatronSessionHandler {
    async fn handle(
        &self,
        request: Request,
        session: &mut SessionState,
    ) -> Result<Response, GatewayError> {
        let Request::EndPatronSession(end) = request else {
            return Err(unexpected("end-patron-session", &request));
        };
        session.clear_patron();
        debug!("Session {}: patron session ended.", session.session_id);
        Ok(Response::EndSession(EndSessionResponse {
            end_session: true,
            transaction_date: Utc::now().fixed_offset(),
            institution_id: end.institution_id,
            patron_identifier: end.patron_identifier,
            screen_message: Vec::new(),
            print_line: Vec::new(),
        }))
    }
}

/// Authenticates the SC operator with the backend and keeps the
/// credentials for the rest of the connection.
#[derive(Debug)]
pub struct LoginHandler {
    backend: Arc<dyn IlsBackend>,
}

impl LoginHandler {
    pub fn new(backend: Arc<dyn IlsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CommandHandler for LoginHandler {
    async fn handle(
        &self,
        request: Request,
        session: &mut SessionState,
    ) -> Result<Response, GatewayError> {
        let Request::Login(login) = &request else {
            return Err(unexpected("login", &request));
        };
        let response = forward(self.backend.as_ref(), &request, session).await?;
        if let Response::Login(LoginResponse { ok: true }) = response {
            session.login = Some(LoginCredentials {
                user_id: login.login_user_id.clone(),
                password: login.login_password.clone(),
                location_code: login.location_code.clone(),
            });
            info!(
                "Session {}: login accepted for '{}'.",
                session.session_id, login.login_user_id
            );
        }
        Ok(response)
    }
}

/// Checks the item in, unless its circulation status is on the tenant's
/// rejection list.
#[derive(Debug)]
pub struct CheckinHandler {
    backend: Arc<dyn IlsBackend>,
}

impl CheckinHandler {
    pub fn new(backend: Arc<dyn IlsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CommandHandler for CheckinHandler {
    async fn handle(
        &self,
        request: Request,
        session: &mut SessionState,
    ) -> Result<Response, GatewayError> {
        let Request::Checkin(checkin) = &request else {
            return Err(unexpected("checkin", &request));
        };

        if !session.settings.checkin_rejected_statuses.is_empty() {
            let lookup = Request::ItemInformation(ItemInformation {
                transaction_date: checkin.transaction_date,
                institution_id: checkin.institution_id.clone(),
                item_identifier: checkin.item_identifier.clone(),
                terminal_password: Some(checkin.terminal_password.clone()),
            });
            if let Response::ItemInformation(item) =
                forward(self.backend.as_ref(), &lookup, session).await?
                && session
                    .settings
                    .checkin_rejected_statuses
                    .contains(&item.circulation_status)
            {
                info!(
                    "Session {}: rejecting checkin of '{}' with circulation status {}.",
                    session.session_id,
                    checkin.item_identifier,
                    item.circulation_status.code()
                );
                return Ok(Response::Checkin(CheckinResponse {
                    ok: false,
                    alert: true,
                    transaction_date: Utc::now().fixed_offset(),
                    institution_id: checkin.institution_id.clone(),
                    item_identifier: checkin.item_identifier.clone(),
                    permanent_location: item.permanent_location.unwrap_or_default(),
                    title_identifier: Some(item.title_identifier),
                    screen_message: vec!["This item cannot be checked in here.".to_string()],
                    ..CheckinResponse::default()
                }));
            }
        }

        forward(self.backend.as_ref(), &request, session).await
    }
}

/// Forwards the request to the backend as is, remembering the patron it names.
#[derive(Debug)]
pub struct ForwardHandler {
    backend: Arc<dyn IlsBackend>,
}

impl ForwardHandler {
    pub fn new(backend: Arc<dyn IlsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CommandHandler for ForwardHandler {
    async fn handle(
        &self,
        request: Request,
        session: &mut SessionState,
    ) -> Result<Response, GatewayError> {
        if let Some(patron) = request.patron_identifier() {
            session.remember_patron(patron, request.patron_password());
        }
        forward(self.backend.as_ref(), &request, session).await
    }
}
