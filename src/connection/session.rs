// src/connection/session.rs

//! Defines the state associated with a single self-check terminal session.

use crate::core::protocol::DecodeContext;
use crate::core::tenant::TenantSettings;
use serde::Serialize;

/// The last response that was rendered successfully, kept to answer a
/// Request ACS Resend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousExchange {
    pub sequence_number: Option<u8>,
    pub checksum: Option<String>,
    /// The full line, error-detection suffix included.
    pub rendered: String,
}

/// Credentials of the SC operator, set by a successful Login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    pub user_id: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub location_code: Option<String>,
}

/// Credentials of the patron currently at the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatronCredentials {
    pub patron_identifier: String,
    #[serde(skip_serializing)]
    pub patron_password: Option<String>,
}

/// Session facts forwarded to the backend with every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: u64,
    pub tenant: Option<String>,
    pub login_user_id: Option<String>,
    pub location_code: Option<String>,
    pub patron_identifier: Option<String>,
    pub locale: String,
    pub currency: String,
    pub timezone: String,
    pub patron_password_verification_required: bool,
    pub use_pin_for_patron_verification: bool,
}

/// Holds the state specific to a single connection. It is owned by the
/// connection task and never shared.
#[derive(Debug)]
pub struct SessionState {
    /// The unique identifier of the connection.
    pub session_id: u64,
    /// Settings of the tenant the connection currently belongs to.
    pub settings: TenantSettings,
    /// The print width reported by the last SC Status.
    pub max_print_width: Option<u16>,
    /// The protocol version reported by the last SC Status.
    pub sc_protocol_version: Option<String>,
    pub login: Option<LoginCredentials>,
    pub patron: Option<PatronCredentials>,
    pub previous_exchange: Option<PreviousExchange>,
    /// Handler failures answered with a negative response.
    pub error_count: u64,
    /// True once a login has moved the session to another tenant.
    pub login_tenant_applied: bool,
}

impl SessionState {
    /// Creates a session with the settings chosen at connect time.
    pub fn new(session_id: u64, settings: TenantSettings) -> Self {
        Self {
            session_id,
            settings,
            max_print_width: None,
            sc_protocol_version: None,
            login: None,
            patron: None,
            previous_exchange: None,
            error_count: 0,
            login_tenant_applied: false,
        }
    }

    /// The current tenant id, `None` for the default tenant.
    pub fn tenant(&self) -> Option<&str> {
        self.settings.tenant.as_deref()
    }

    /// The settings the decoder needs for the next line.
    pub fn decode_context(&self) -> DecodeContext {
        DecodeContext {
            field_delimiter: self.settings.field_delimiter,
            charset: self.settings.charset,
            error_detection: self.settings.error_detection,
            timezone: self.settings.timezone,
        }
    }

    /// Switches to a tenant selected at login. Framing settings stay as they
    /// were negotiated at connect time; only tenant-scoped settings reload.
    /// Returns false if the tenant is unchanged or a login already switched it.
    pub fn apply_login_tenant(&mut self, resolved: TenantSettings) -> bool {
        if resolved.tenant == self.settings.tenant || self.login_tenant_applied {
            return false;
        }
        let framing = (
            self.settings.message_delimiter,
            self.settings.field_delimiter,
            self.settings.charset,
            self.settings.error_detection,
        );
        self.settings = TenantSettings {
            message_delimiter: framing.0,
            field_delimiter: framing.1,
            charset: framing.2,
            error_detection: framing.3,
            ..resolved
        };
        self.login_tenant_applied = true;
        true
    }

    /// Records the patron named by a request.
    pub fn remember_patron(&mut self, patron_identifier: &str, patron_password: Option<&str>) {
        if patron_identifier.is_empty() {
            return;
        }
        self.patron = Some(PatronCredentials {
            patron_identifier: patron_identifier.to_string(),
            patron_password: patron_password.map(str::to_string),
        });
    }

    /// Forgets the current patron (End Patron Session).
    pub fn clear_patron(&mut self) {
        self.patron = None;
    }

    /// Stores the previous exchange after a response was rendered.
    pub fn record_exchange(&mut self, exchange: PreviousExchange) {
        self.previous_exchange = Some(exchange);
    }

    /// A serializable view of the session for backend calls.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id,
            tenant: self.settings.tenant.clone(),
            login_user_id: self.login.as_ref().map(|l| l.user_id.clone()),
            location_code: self.login.as_ref().and_then(|l| l.location_code.clone()),
            patron_identifier: self.patron.as_ref().map(|p| p.patron_identifier.clone()),
            locale: self.settings.locale.clone(),
            currency: self.settings.currency.code().to_string(),
            timezone: self.settings.timezone.name().to_string(),
            patron_password_verification_required: self
                .settings
                .patron_password_verification_required,
            use_pin_for_patron_verification: self.settings.use_pin_for_patron_verification,
        }
    }
}
