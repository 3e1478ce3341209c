// src/core/protocol/messages/requests.rs

//! Typed payloads of the messages a self-check terminal sends.

use crate::core::protocol::Command;
use crate::core::protocol::types::{
    CurrencyType, FeeType, HoldMode, HoldType, Language, PaymentType, StatusCode, SummaryItem,
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

type Timestamp = Option<DateTime<FixedOffset>>;

/// 93: Login.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Login {
    pub uid_algorithm: char,
    pub pwd_algorithm: char,
    pub login_user_id: String,
    pub login_password: String,
    pub location_code: Option<String>,
}

/// 99: SC Status.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScStatus {
    pub status_code: Option<StatusCode>,
    pub max_print_width: Option<u16>,
    pub protocol_version: String,
}

/// 11: Checkout.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Checkout {
    pub sc_renewal_policy: bool,
    pub no_block: bool,
    pub transaction_date: Timestamp,
    pub nb_due_date: Timestamp,
    pub institution_id: String,
    pub patron_identifier: String,
    pub item_identifier: String,
    pub terminal_password: String,
    pub item_properties: Option<String>,
    pub patron_password: Option<String>,
    pub fee_acknowledged: Option<bool>,
    pub cancel: Option<bool>,
}

/// 09: Checkin.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Checkin {
    pub no_block: bool,
    pub transaction_date: Timestamp,
    pub return_date: Timestamp,
    pub current_location: String,
    pub institution_id: String,
    pub item_identifier: String,
    pub terminal_password: String,
    pub item_properties: Option<String>,
    pub cancel: Option<bool>,
}

/// 23: Patron Status Request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PatronStatusRequest {
    pub language: Option<Language>,
    pub transaction_date: Timestamp,
    pub institution_id: String,
    pub patron_identifier: String,
    pub terminal_password: String,
    pub patron_password: String,
}

/// 63: Patron Information.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PatronInformation {
    pub language: Option<Language>,
    pub transaction_date: Timestamp,
    pub summary: Option<SummaryItem>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub terminal_password: Option<String>,
    pub patron_password: Option<String>,
    pub start_item: Option<u32>,
    pub end_item: Option<u32>,
}

/// 35: End Patron Session.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EndPatronSession {
    pub transaction_date: Timestamp,
    pub institution_id: String,
    pub patron_identifier: String,
    pub terminal_password: Option<String>,
    pub patron_password: Option<String>,
}

/// 37: Fee Paid.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeePaid {
    pub transaction_date: Timestamp,
    pub fee_type: Option<FeeType>,
    pub payment_type: Option<PaymentType>,
    pub currency_type: Option<CurrencyType>,
    pub fee_amount: String,
    pub institution_id: String,
    pub patron_identifier: String,
    pub terminal_password: Option<String>,
    pub patron_password: Option<String>,
    pub fee_identifier: Option<String>,
    pub transaction_id: Option<String>,
}

/// 17: Item Information.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ItemInformation {
    pub transaction_date: Timestamp,
    pub institution_id: String,
    pub item_identifier: String,
    pub terminal_password: Option<String>,
}

/// 29: Renew.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Renew {
    pub third_party_allowed: bool,
    pub no_block: bool,
    pub transaction_date: Timestamp,
    pub nb_due_date: Timestamp,
    pub institution_id: String,
    pub patron_identifier: String,
    pub patron_password: Option<String>,
    pub item_identifier: Option<String>,
    pub title_identifier: Option<String>,
    pub terminal_password: Option<String>,
    pub item_properties: Option<String>,
    pub fee_acknowledged: Option<bool>,
}

/// 65: Renew All.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RenewAll {
    pub transaction_date: Timestamp,
    pub institution_id: String,
    pub patron_identifier: String,
    pub patron_password: Option<String>,
    pub terminal_password: Option<String>,
    pub fee_acknowledged: Option<bool>,
}

/// 01: Block Patron.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlockPatron {
    pub card_retained: bool,
    pub transaction_date: Timestamp,
    pub institution_id: String,
    pub blocked_card_msg: String,
    pub patron_identifier: String,
    pub terminal_password: String,
}

/// 15: Hold.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Hold {
    pub hold_mode: Option<HoldMode>,
    pub transaction_date: Timestamp,
    pub expiration_date: Timestamp,
    pub pickup_location: Option<String>,
    pub hold_type: Option<HoldType>,
    pub institution_id: String,
    pub patron_identifier: String,
    pub patron_password: Option<String>,
    pub item_identifier: Option<String>,
    pub title_identifier: Option<String>,
    pub terminal_password: Option<String>,
    pub fee_acknowledged: Option<bool>,
}

/// 19: Item Status Update.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ItemStatusUpdate {
    pub transaction_date: Timestamp,
    pub institution_id: String,
    pub item_identifier: String,
    pub terminal_password: Option<String>,
    pub item_properties: String,
}

/// 25: Patron Enable.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PatronEnable {
    pub transaction_date: Timestamp,
    pub institution_id: String,
    pub patron_identifier: String,
    pub terminal_password: Option<String>,
    pub patron_password: Option<String>,
}

/// A decoded request payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Request {
    Login(Login),
    ScStatus(ScStatus),
    Checkout(Checkout),
    Checkin(Checkin),
    PatronStatus(PatronStatusRequest),
    PatronInformation(PatronInformation),
    EndPatronSession(EndPatronSession),
    FeePaid(FeePaid),
    ItemInformation(ItemInformation),
    Renew(Renew),
    RenewAll(RenewAll),
    BlockPatron(BlockPatron),
    Hold(Hold),
    ItemStatusUpdate(ItemStatusUpdate),
    PatronEnable(PatronEnable),
    RequestAcsResend,
}

impl Request {
    /// The command this payload belongs to.
    pub fn command(&self) -> Command {
        match self {
            Request::Login(_) => Command::Login,
            Request::ScStatus(_) => Command::ScStatus,
            Request::Checkout(_) => Command::Checkout,
            Request::Checkin(_) => Command::Checkin,
            Request::PatronStatus(_) => Command::PatronStatusRequest,
            Request::PatronInformation(_) => Command::PatronInformation,
            Request::EndPatronSession(_) => Command::EndPatronSession,
            Request::FeePaid(_) => Command::FeePaid,
            Request::ItemInformation(_) => Command::ItemInformation,
            Request::Renew(_) => Command::Renew,
            Request::RenewAll(_) => Command::RenewAll,
            Request::BlockPatron(_) => Command::BlockPatron,
            Request::Hold(_) => Command::Hold,
            Request::ItemStatusUpdate(_) => Command::ItemStatusUpdate,
            Request::PatronEnable(_) => Command::PatronEnable,
            Request::RequestAcsResend => Command::RequestAcsResend,
        }
    }

    /// The institution id the request carries, if its layout has one.
    pub fn institution_id(&self) -> Option<&str> {
        match self {
            Request::Checkout(r) => Some(&r.institution_id),
            Request::Checkin(r) => Some(&r.institution_id),
            Request::PatronStatus(r) => Some(&r.institution_id),
            Request::PatronInformation(r) => Some(&r.institution_id),
            Request::EndPatronSession(r) => Some(&r.institution_id),
            Request::FeePaid(r) => Some(&r.institution_id),
            Request::ItemInformation(r) => Some(&r.institution_id),
            Request::Renew(r) => Some(&r.institution_id),
            Request::RenewAll(r) => Some(&r.institution_id),
            Request::BlockPatron(r) => Some(&r.institution_id),
            Request::Hold(r) => Some(&r.institution_id),
            Request::ItemStatusUpdate(r) => Some(&r.institution_id),
            Request::PatronEnable(r) => Some(&r.institution_id),
            Request::Login(_) | Request::ScStatus(_) | Request::RequestAcsResend => None,
        }
    }

    /// The patron the request is about, if any.
    pub fn patron_identifier(&self) -> Option<&str> {
        match self {
            Request::Checkout(r) => Some(&r.patron_identifier),
            Request::PatronStatus(r) => Some(&r.patron_identifier),
            Request::PatronInformation(r) => Some(&r.patron_identifier),
            Request::EndPatronSession(r) => Some(&r.patron_identifier),
            Request::FeePaid(r) => Some(&r.patron_identifier),
            Request::Renew(r) => Some(&r.patron_identifier),
            Request::RenewAll(r) => Some(&r.patron_identifier),
            Request::BlockPatron(r) => Some(&r.patron_identifier),
            Request::Hold(r) => Some(&r.patron_identifier),
            Request::PatronEnable(r) => Some(&r.patron_identifier),
            _ => None,
        }
    }

    /// The patron password the request carries, if any.
    pub fn patron_password(&self) -> Option<&str> {
        match self {
            Request::Checkout(r) => r.patron_password.as_deref(),
            Request::PatronStatus(r) => Some(&r.patron_password),
            Request::PatronInformation(r) => r.patron_password.as_deref(),
            Request::EndPatronSession(r) => r.patron_password.as_deref(),
            Request::FeePaid(r) => r.patron_password.as_deref(),
            Request::Renew(r) => r.patron_password.as_deref(),
            Request::RenewAll(r) => r.patron_password.as_deref(),
            Request::Hold(r) => r.patron_password.as_deref(),
            Request::PatronEnable(r) => r.patron_password.as_deref(),
            _ => None,
        }
    }
}
