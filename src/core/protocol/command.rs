// src/core/protocol/command.rs

//! The closed set of SIP2 commands and their two-digit wire codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::EnumIter;
use tracing::warn;

/// Every message identifier understood by the gateway, in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    // --- SC -> ACS ---
    BlockPatron,
    Checkin,
    Checkout,
    Hold,
    ItemInformation,
    ItemStatusUpdate,
    PatronStatusRequest,
    PatronEnable,
    Renew,
    EndPatronSession,
    FeePaid,
    PatronInformation,
    RenewAll,
    Login,
    RequestAcsResend,
    ScStatus,

    // --- ACS -> SC ---
    CheckinResponse,
    CheckoutResponse,
    HoldResponse,
    ItemInformationResponse,
    ItemStatusUpdateResponse,
    PatronStatusResponse,
    PatronEnableResponse,
    RenewResponse,
    EndSessionResponse,
    FeePaidResponse,
    PatronInformationResponse,
    RenewAllResponse,
    LoginResponse,
    RequestScResend,
    AcsStatus,

    /// Sentinel for codes that are not in the table.
    Unknown,
}

/// The static code table. `Unknown` is deliberately absent.
const COMMAND_CODES: &[(Command, &str)] = &[
    (Command::BlockPatron, "01"),
    (Command::Checkin, "09"),
    (Command::Checkout, "11"),
    (Command::Hold, "15"),
    (Command::ItemInformation, "17"),
    (Command::ItemStatusUpdate, "19"),
    (Command::PatronStatusRequest, "23"),
    (Command::PatronEnable, "25"),
    (Command::Renew, "29"),
    (Command::EndPatronSession, "35"),
    (Command::FeePaid, "37"),
    (Command::PatronInformation, "63"),
    (Command::RenewAll, "65"),
    (Command::Login, "93"),
    (Command::RequestAcsResend, "97"),
    (Command::ScStatus, "99"),
    (Command::CheckinResponse, "10"),
    (Command::CheckoutResponse, "12"),
    (Command::HoldResponse, "16"),
    (Command::ItemInformationResponse, "18"),
    (Command::ItemStatusUpdateResponse, "20"),
    (Command::PatronStatusResponse, "24"),
    (Command::PatronEnableResponse, "26"),
    (Command::RenewResponse, "30"),
    (Command::EndSessionResponse, "36"),
    (Command::FeePaidResponse, "38"),
    (Command::PatronInformationResponse, "64"),
    (Command::RenewAllResponse, "66"),
    (Command::LoginResponse, "94"),
    (Command::RequestScResend, "96"),
    (Command::AcsStatus, "98"),
];

impl Command {
    /// Looks up a two-character code. Returns `None` for unmapped codes.
    pub fn parse(code: &str) -> Option<Command> {
        COMMAND_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(command, _)| *command)
    }

    /// Total lookup: unmapped codes resolve to [`Command::Unknown`] and are logged.
    pub fn from_code(code: &str) -> Command {
        Self::parse(code).unwrap_or_else(|| {
            warn!("Unknown command code '{}'", code);
            Command::Unknown
        })
    }

    /// The two-digit wire code, or `"??"` for the sentinel.
    pub fn code(&self) -> &'static str {
        COMMAND_CODES
            .iter()
            .find(|(command, _)| command == self)
            .map(|(_, code)| *code)
            .unwrap_or("??")
    }

    /// True for messages an SC sends to the ACS.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Command::BlockPatron
                | Command::Checkin
                | Command::Checkout
                | Command::Hold
                | Command::ItemInformation
                | Command::ItemStatusUpdate
                | Command::PatronStatusRequest
                | Command::PatronEnable
                | Command::Renew
                | Command::EndPatronSession
                | Command::FeePaid
                | Command::PatronInformation
                | Command::RenewAll
                | Command::Login
                | Command::RequestAcsResend
                | Command::ScStatus
        )
    }

    /// The response command an ACS answers a request with.
    pub fn response_command(&self) -> Option<Command> {
        let response = match self {
            Command::BlockPatron | Command::PatronStatusRequest => Command::PatronStatusResponse,
            Command::Checkin => Command::CheckinResponse,
            Command::Checkout => Command::CheckoutResponse,
            Command::Hold => Command::HoldResponse,
            Command::ItemInformation => Command::ItemInformationResponse,
            Command::ItemStatusUpdate => Command::ItemStatusUpdateResponse,
            Command::PatronEnable => Command::PatronEnableResponse,
            Command::Renew => Command::RenewResponse,
            Command::EndPatronSession => Command::EndSessionResponse,
            Command::FeePaid => Command::FeePaidResponse,
            Command::PatronInformation => Command::PatronInformationResponse,
            Command::RenewAll => Command::RenewAllResponse,
            Command::Login => Command::LoginResponse,
            Command::ScStatus => Command::AcsStatus,
            _ => return None,
        };
        Some(response)
    }

    /// A lower-kebab-case name, used as the backend path segment and in logs.
    pub fn slug(&self) -> &'static str {
        match self {
            Command::BlockPatron => "block-patron",
            Command::Checkin => "checkin",
            Command::Checkout => "checkout",
            Command::Hold => "hold",
            Command::ItemInformation => "item-information",
            Command::ItemStatusUpdate => "item-status-update",
            Command::PatronStatusRequest => "patron-status",
            Command::PatronEnable => "patron-enable",
            Command::Renew => "renew",
            Command::EndPatronSession => "end-patron-session",
            Command::FeePaid => "fee-paid",
            Command::PatronInformation => "patron-information",
            Command::RenewAll => "renew-all",
            Command::Login => "login",
            Command::RequestAcsResend => "request-acs-resend",
            Command::ScStatus => "sc-status",
            Command::CheckinResponse => "checkin-response",
            Command::CheckoutResponse => "checkout-response",
            Command::HoldResponse => "hold-response",
            Command::ItemInformationResponse => "item-information-response",
            Command::ItemStatusUpdateResponse => "item-status-update-response",
            Command::PatronStatusResponse => "patron-status-response",
            Command::PatronEnableResponse => "patron-enable-response",
            Command::RenewResponse => "renew-response",
            Command::EndSessionResponse => "end-session-response",
            Command::FeePaidResponse => "fee-paid-response",
            Command::PatronInformationResponse => "patron-information-response",
            Command::RenewAllResponse => "renew-all-response",
            Command::LoginResponse => "login-response",
            Command::RequestScResend => "request-sc-resend",
            Command::AcsStatus => "acs-status",
            Command::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
