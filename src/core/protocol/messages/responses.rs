// src/core/protocol/messages/responses.rs

//! Typed payloads of the messages the gateway sends back to a terminal.
//!
//! Responses are deserializable so that a backend can return them as JSON;
//! missing fields take their defaults and a missing transaction date is
//! filled in with the current time.

use super::requests::Request;
use crate::core::GatewayError;
use crate::core::protocol::Command;
use crate::core::protocol::types::{
    CirculationStatus, CurrencyType, FeeType, Language, MediaType, PatronStatus, SecurityMarker,
    SupportedMessages,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// The protocol version the gateway implements.
pub const PROTOCOL_VERSION: &str = "2.00";

fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

/// 94: Login Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    pub ok: bool,
}

/// 98: ACS Status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcsStatus {
    pub online_status: bool,
    pub checkin_ok: bool,
    pub checkout_ok: bool,
    pub acs_renewal_policy: bool,
    pub status_update_ok: bool,
    pub offline_ok: bool,
    pub timeout_period: u16,
    pub retries_allowed: u16,
    #[serde(default = "now")]
    pub date_time_sync: DateTime<FixedOffset>,
    pub protocol_version: String,
    pub institution_id: String,
    pub library_name: Option<String>,
    pub supported_messages: SupportedMessages,
    pub terminal_location: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

impl Default for AcsStatus {
    fn default() -> Self {
        Self {
            online_status: true,
            checkin_ok: true,
            checkout_ok: true,
            acs_renewal_policy: true,
            status_update_ok: false,
            offline_ok: false,
            timeout_period: 10,
            retries_allowed: 3,
            date_time_sync: now(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            institution_id: String::new(),
            library_name: None,
            supported_messages: SupportedMessages::default(),
            terminal_location: None,
            screen_message: Vec::new(),
            print_line: Vec::new(),
        }
    }
}

/// 12: Checkout Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutResponse {
    pub ok: bool,
    pub renewal_ok: bool,
    pub magnetic_media: Option<bool>,
    pub desensitize: Option<bool>,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub item_identifier: String,
    pub title_identifier: String,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub fee_type: Option<FeeType>,
    pub security_inhibit: Option<bool>,
    pub currency_type: Option<CurrencyType>,
    pub fee_amount: Option<String>,
    pub media_type: Option<MediaType>,
    pub item_properties: Option<String>,
    pub transaction_id: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 10: Checkin Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinResponse {
    pub ok: bool,
    pub resensitize: bool,
    pub magnetic_media: Option<bool>,
    pub alert: bool,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub item_identifier: String,
    pub permanent_location: String,
    pub title_identifier: Option<String>,
    pub sort_bin: Option<String>,
    pub patron_identifier: Option<String>,
    pub media_type: Option<MediaType>,
    pub item_properties: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 24: Patron Status Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatronStatusResponse {
    pub patron_status: PatronStatus,
    pub language: Language,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub personal_name: String,
    pub valid_patron: Option<bool>,
    pub valid_patron_password: Option<bool>,
    pub currency_type: Option<CurrencyType>,
    pub fee_amount: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 64: Patron Information Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatronInformationResponse {
    pub patron_status: PatronStatus,
    pub language: Language,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub hold_items_count: Option<u16>,
    pub overdue_items_count: Option<u16>,
    pub charged_items_count: Option<u16>,
    pub fine_items_count: Option<u16>,
    pub recall_items_count: Option<u16>,
    pub unavailable_holds_count: Option<u16>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub personal_name: String,
    pub hold_items_limit: Option<u16>,
    pub overdue_items_limit: Option<u16>,
    pub charged_items_limit: Option<u16>,
    pub valid_patron: Option<bool>,
    pub valid_patron_password: Option<bool>,
    pub currency_type: Option<CurrencyType>,
    pub fee_amount: Option<String>,
    pub fee_limit: Option<String>,
    pub hold_items: Vec<String>,
    pub overdue_items: Vec<String>,
    pub charged_items: Vec<String>,
    pub fine_items: Vec<String>,
    pub recall_items: Vec<String>,
    pub unavailable_hold_items: Vec<String>,
    pub home_address: Option<String>,
    pub email_address: Option<String>,
    pub home_phone_number: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 36: End Session Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndSessionResponse {
    pub end_session: bool,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 38: Fee Paid Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePaidResponse {
    pub payment_accepted: bool,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub transaction_id: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 18: Item Information Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemInformationResponse {
    pub circulation_status: CirculationStatus,
    pub security_marker: SecurityMarker,
    pub fee_type: FeeType,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub hold_queue_length: Option<u32>,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub recall_date: Option<DateTime<FixedOffset>>,
    pub hold_pickup_date: Option<DateTime<FixedOffset>>,
    pub item_identifier: String,
    pub title_identifier: String,
    pub owner: Option<String>,
    pub currency_type: Option<CurrencyType>,
    pub fee_amount: Option<String>,
    pub media_type: Option<MediaType>,
    pub permanent_location: Option<String>,
    pub current_location: Option<String>,
    pub item_properties: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 30: Renew Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewResponse {
    pub ok: bool,
    pub renewal_ok: bool,
    pub magnetic_media: Option<bool>,
    pub desensitize: Option<bool>,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub item_identifier: String,
    pub title_identifier: String,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub fee_type: Option<FeeType>,
    pub security_inhibit: Option<bool>,
    pub currency_type: Option<CurrencyType>,
    pub fee_amount: Option<String>,
    pub media_type: Option<MediaType>,
    pub item_properties: Option<String>,
    pub transaction_id: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 66: Renew All Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewAllResponse {
    pub ok: bool,
    pub renewed_count: Option<u16>,
    pub unrenewed_count: Option<u16>,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub renewed_items: Vec<String>,
    pub unrenewed_items: Vec<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 16: Hold Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldResponse {
    pub ok: bool,
    pub available: bool,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub expiration_date: Option<DateTime<FixedOffset>>,
    pub queue_position: Option<u32>,
    pub pickup_location: Option<String>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub item_identifier: Option<String>,
    pub title_identifier: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 20: Item Status Update Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStatusUpdateResponse {
    pub item_properties_ok: bool,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub item_identifier: String,
    pub title_identifier: Option<String>,
    pub item_properties: Option<String>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// 26: Patron Enable Response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatronEnableResponse {
    pub patron_status: PatronStatus,
    pub language: Language,
    #[serde(default = "now")]
    pub transaction_date: DateTime<FixedOffset>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub personal_name: String,
    pub valid_patron: Option<bool>,
    pub valid_patron_password: Option<bool>,
    pub screen_message: Vec<String>,
    pub print_line: Vec<String>,
}

/// A response ready to be encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Login(LoginResponse),
    AcsStatus(AcsStatus),
    Checkout(CheckoutResponse),
    Checkin(CheckinResponse),
    PatronStatus(PatronStatusResponse),
    PatronInformation(PatronInformationResponse),
    EndSession(EndSessionResponse),
    FeePaid(FeePaidResponse),
    ItemInformation(ItemInformationResponse),
    Renew(RenewResponse),
    RenewAll(RenewAllResponse),
    Hold(HoldResponse),
    ItemStatusUpdate(ItemStatusUpdateResponse),
    PatronEnable(PatronEnableResponse),
    RequestScResend,
}

impl Response {
    /// The command identifier rendered at the start of the line.
    pub fn command(&self) -> Command {
        match self {
            Response::Login(_) => Command::LoginResponse,
            Response::AcsStatus(_) => Command::AcsStatus,
            Response::Checkout(_) => Command::CheckoutResponse,
            Response::Checkin(_) => Command::CheckinResponse,
            Response::PatronStatus(_) => Command::PatronStatusResponse,
            Response::PatronInformation(_) => Command::PatronInformationResponse,
            Response::EndSession(_) => Command::EndSessionResponse,
            Response::FeePaid(_) => Command::FeePaidResponse,
            Response::ItemInformation(_) => Command::ItemInformationResponse,
            Response::Renew(_) => Command::RenewResponse,
            Response::RenewAll(_) => Command::RenewAllResponse,
            Response::Hold(_) => Command::HoldResponse,
            Response::ItemStatusUpdate(_) => Command::ItemStatusUpdateResponse,
            Response::PatronEnable(_) => Command::PatronEnableResponse,
            Response::RequestScResend => Command::RequestScResend,
        }
    }

    /// Deserializes a backend JSON body as the response to `request_command`.
    pub fn from_json(
        request_command: Command,
        value: serde_json::Value,
    ) -> Result<Response, GatewayError> {
        let response = match request_command {
            Command::Login => Response::Login(serde_json::from_value(value)?),
            Command::ScStatus => Response::AcsStatus(serde_json::from_value(value)?),
            Command::Checkout => Response::Checkout(serde_json::from_value(value)?),
            Command::Checkin => Response::Checkin(serde_json::from_value(value)?),
            Command::PatronStatusRequest | Command::BlockPatron => {
                Response::PatronStatus(serde_json::from_value(value)?)
            }
            Command::PatronInformation => {
                Response::PatronInformation(serde_json::from_value(value)?)
            }
            Command::EndPatronSession => Response::EndSession(serde_json::from_value(value)?),
            Command::FeePaid => Response::FeePaid(serde_json::from_value(value)?),
            Command::ItemInformation => Response::ItemInformation(serde_json::from_value(value)?),
            Command::Renew => Response::Renew(serde_json::from_value(value)?),
            Command::RenewAll => Response::RenewAll(serde_json::from_value(value)?),
            Command::Hold => Response::Hold(serde_json::from_value(value)?),
            Command::ItemStatusUpdate => {
                Response::ItemStatusUpdate(serde_json::from_value(value)?)
            }
            Command::PatronEnable => Response::PatronEnable(serde_json::from_value(value)?),
            other => return Err(GatewayError::UnsupportedCommand(other)),
        };
        Ok(response)
    }

    /// Builds the locally rendered negative response for a failed request.
    ///
    /// Echo fields are copied from the request; `screen_message` is shown on
    /// the terminal. Returns `None` for Request ACS Resend, which has no
    /// response of its own.
    pub fn negative(
        request: &Request,
        transaction_date: DateTime<FixedOffset>,
        screen_message: &str,
    ) -> Option<Response> {
        let screen_message = vec![screen_message.to_string()];
        let response = match request {
            Request::Login(_) => Response::Login(LoginResponse { ok: false }),
            Request::ScStatus(_) => Response::AcsStatus(AcsStatus {
                online_status: false,
                checkin_ok: false,
                checkout_ok: false,
                acs_renewal_policy: false,
                date_time_sync: transaction_date,
                screen_message,
                ..AcsStatus::default()
            }),
            Request::Checkout(r) => Response::Checkout(CheckoutResponse {
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                item_identifier: r.item_identifier.clone(),
                screen_message,
                ..CheckoutResponse::default()
            }),
            Request::Checkin(r) => Response::Checkin(CheckinResponse {
                transaction_date,
                institution_id: r.institution_id.clone(),
                item_identifier: r.item_identifier.clone(),
                permanent_location: r.current_location.clone(),
                screen_message,
                ..CheckinResponse::default()
            }),
            Request::PatronStatus(r) => Response::PatronStatus(PatronStatusResponse {
                patron_status: PatronStatus::all(),
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                valid_patron: Some(false),
                screen_message,
                ..PatronStatusResponse::default()
            }),
            Request::BlockPatron(r) => Response::PatronStatus(PatronStatusResponse {
                patron_status: PatronStatus::all(),
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                screen_message,
                ..PatronStatusResponse::default()
            }),
            Request::PatronInformation(r) => {
                Response::PatronInformation(PatronInformationResponse {
                    patron_status: PatronStatus::all(),
                    transaction_date,
                    institution_id: r.institution_id.clone(),
                    patron_identifier: r.patron_identifier.clone(),
                    valid_patron: Some(false),
                    screen_message,
                    ..PatronInformationResponse::default()
                })
            }
            Request::EndPatronSession(r) => Response::EndSession(EndSessionResponse {
                end_session: false,
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                screen_message,
                ..EndSessionResponse::default()
            }),
            Request::FeePaid(r) => Response::FeePaid(FeePaidResponse {
                payment_accepted: false,
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                transaction_id: r.transaction_id.clone(),
                screen_message,
                ..FeePaidResponse::default()
            }),
            Request::ItemInformation(r) => Response::ItemInformation(ItemInformationResponse {
                transaction_date,
                item_identifier: r.item_identifier.clone(),
                screen_message,
                ..ItemInformationResponse::default()
            }),
            Request::Renew(r) => Response::Renew(RenewResponse {
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                item_identifier: r.item_identifier.clone().unwrap_or_default(),
                title_identifier: r.title_identifier.clone().unwrap_or_default(),
                screen_message,
                ..RenewResponse::default()
            }),
            Request::RenewAll(r) => Response::RenewAll(RenewAllResponse {
                transaction_date,
                institution_id: r.institution_id.clone(),
                renewed_count: Some(0),
                unrenewed_count: Some(0),
                screen_message,
                ..RenewAllResponse::default()
            }),
            Request::Hold(r) => Response::Hold(HoldResponse {
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                item_identifier: r.item_identifier.clone(),
                title_identifier: r.title_identifier.clone(),
                screen_message,
                ..HoldResponse::default()
            }),
            Request::ItemStatusUpdate(r) => {
                Response::ItemStatusUpdate(ItemStatusUpdateResponse {
                    item_properties_ok: false,
                    transaction_date,
                    item_identifier: r.item_identifier.clone(),
                    screen_message,
                    ..ItemStatusUpdateResponse::default()
                })
            }
            Request::PatronEnable(r) => Response::PatronEnable(PatronEnableResponse {
                patron_status: PatronStatus::all(),
                transaction_date,
                institution_id: r.institution_id.clone(),
                patron_identifier: r.patron_identifier.clone(),
                valid_patron: Some(false),
                screen_message,
                ..PatronEnableResponse::default()
            }),
            Request::RequestAcsResend => return None,
        };
        Some(response)
    }
}
