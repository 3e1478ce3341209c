// src/core/protocol/encoder.rs

//! Renders typed messages as SIP2 lines.
//!
//! Encoding is a pure function of the message, the field delimiter and the
//! session timezone. The rendered line always ends with the field delimiter;
//! the error-detection suffix is appended separately by the caller (see
//! [`super::checksum::append_error_detection`]).

use super::command::Command;
use super::datetime::{BLANK_DATE_TIME, format_date_time};
use super::field::Field;
use super::messages::*;
use super::types::SummaryItem;
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

/// Appends fixed and variable fields to a line under construction.
pub struct FieldWriter {
    line: String,
    delimiter: char,
    timezone: Tz,
    has_fields: bool,
}

impl FieldWriter {
    pub fn new(command: Command, delimiter: char, timezone: Tz) -> Self {
        let mut line = String::with_capacity(128);
        line.push_str(command.code());
        Self {
            line,
            delimiter,
            timezone,
            has_fields: false,
        }
    }

    /// Appends a fixed-width value verbatim.
    pub fn fixed(&mut self, value: &str) -> &mut Self {
        self.line.push_str(value);
        self
    }

    /// A single `Y`/`N` flag.
    pub fn yes_no(&mut self, value: bool) -> &mut Self {
        self.line.push(if value { 'Y' } else { 'N' });
        self
    }

    /// A single `1`/`0` "ok" flag.
    pub fn ok(&mut self, value: bool) -> &mut Self {
        self.line.push(if value { '1' } else { '0' });
        self
    }

    /// A `Y`/`N`/`U` flag where `None` means unknown.
    pub fn tri_state(&mut self, value: Option<bool>) -> &mut Self {
        self.line.push(match value {
            Some(true) => 'Y',
            Some(false) => 'N',
            None => 'U',
        });
        self
    }

    /// An 18-character date/time, or 18 spaces when absent.
    pub fn date(&mut self, value: Option<&DateTime<FixedOffset>>) -> &mut Self {
        match value {
            Some(dt) => {
                let rendered = format_date_time(dt, self.timezone);
                self.line.push_str(&rendered);
            }
            None => self.line.push_str(BLANK_DATE_TIME),
        }
        self
    }

    /// A zero-padded number of `width` digits, clamped to the widest value
    /// that fits, or `width` spaces when absent.
    pub fn number(&mut self, value: Option<u32>, width: usize) -> &mut Self {
        match value {
            Some(n) => {
                let max = 10u32.saturating_pow(width as u32).saturating_sub(1);
                self.line
                    .push_str(&format!("{:0width$}", n.min(max), width = width));
            }
            None => self.line.push_str(&" ".repeat(width)),
        }
        self
    }

    /// A fixed-width code, or `width` spaces when absent.
    pub fn code(&mut self, code: Option<&str>, width: usize) -> &mut Self {
        match code {
            Some(c) => self.line.push_str(c),
            None => self.line.push_str(&" ".repeat(width)),
        }
        self
    }

    /// A variable field; omitted entirely when `value` is `None`.
    pub fn field(&mut self, field: Field, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.required(field, v);
        }
        self
    }

    /// A variable field that is always present, possibly empty.
    pub fn required(&mut self, field: Field, value: &str) -> &mut Self {
        self.line.push_str(field.code());
        let delimiter = self.delimiter;
        self.line
            .extend(value.chars().map(|c| if c == delimiter { ' ' } else { c }));
        self.line.push(delimiter);
        self.has_fields = true;
        self
    }

    /// A repeatable variable field, rendered once per value.
    pub fn repeated(&mut self, field: Field, values: &[String]) -> &mut Self {
        for v in values {
            self.required(field, v);
        }
        self
    }

    /// A `Y`/`N` variable field, omitted when `None`.
    pub fn yes_no_field(&mut self, field: Field, value: Option<bool>) -> &mut Self {
        self.field(field, value.map(|v| if v { "Y" } else { "N" }))
    }

    /// A date/time variable field, omitted when `None`.
    pub fn date_field(&mut self, field: Field, value: Option<&DateTime<FixedOffset>>) -> &mut Self {
        if let Some(dt) = value {
            let rendered = format_date_time(dt, self.timezone);
            self.required(field, &rendered);
        }
        self
    }

    /// A numeric variable field, omitted when `None`.
    pub fn number_field(&mut self, field: Field, value: Option<u32>) -> &mut Self {
        if let Some(n) = value {
            self.required(field, &n.to_string());
        }
        self
    }

    /// Completes the line, guaranteeing a trailing field delimiter.
    pub fn finish(mut self) -> String {
        if !self.has_fields {
            self.line.push(self.delimiter);
        }
        self.line
    }
}

fn count(value: Option<u16>) -> Option<u32> {
    value.map(u32::from)
}

/// Renders a response. The Request SC Resend message has no fields and no
/// trailing delimiter.
pub fn encode_response(response: &Response, delimiter: char, timezone: Tz) -> String {
    let command = response.command();
    let mut w = FieldWriter::new(command, delimiter, timezone);
    match response {
        // The only response without fields: SCs expect the line `96`, or
        // `96AZxxxx` with error detection, so no field delimiter is written.
        Response::RequestScResend => return command.code().to_string(),
        Response::Login(r) => {
            w.ok(r.ok);
        }
        Response::AcsStatus(r) => {
            w.yes_no(r.online_status)
                .yes_no(r.checkin_ok)
                .yes_no(r.checkout_ok)
                .yes_no(r.acs_renewal_policy)
                .yes_no(r.status_update_ok)
                .yes_no(r.offline_ok)
                .number(Some(u32::from(r.timeout_period)), 3)
                .number(Some(u32::from(r.retries_allowed)), 3)
                .date(Some(&r.date_time_sync))
                .fixed(&format!("{:<4.4}", r.protocol_version))
                .required(Field::InstitutionId, &r.institution_id)
                .field(Field::LibraryName, r.library_name.as_deref())
                .required(Field::SupportedMessages, &r.supported_messages.to_wire())
                .field(Field::TerminalLocation, r.terminal_location.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::Checkout(r) => {
            w.ok(r.ok)
                .yes_no(r.renewal_ok)
                .tri_state(r.magnetic_media)
                .tri_state(r.desensitize)
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::ItemIdentifier, &r.item_identifier)
                .required(Field::TitleIdentifier, &r.title_identifier);
            match &r.due_date {
                Some(due) => w.date_field(Field::DueDate, Some(due)),
                None => w.required(Field::DueDate, ""),
            };
            w.field(Field::FeeType, r.fee_type.as_ref().map(|t| t.code()))
                .yes_no_field(Field::SecurityInhibit, r.security_inhibit)
                .field(Field::CurrencyType, r.currency_type.as_ref().map(|c| c.code()))
                .field(Field::FeeAmount, r.fee_amount.as_deref())
                .field(Field::MediaType, r.media_type.as_ref().map(|m| m.code()))
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .field(Field::TransactionId, r.transaction_id.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::Checkin(r) => {
            w.ok(r.ok)
                .yes_no(r.resensitize)
                .tri_state(r.magnetic_media)
                .yes_no(r.alert)
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::ItemIdentifier, &r.item_identifier)
                .required(Field::PermanentLocation, &r.permanent_location)
                .field(Field::TitleIdentifier, r.title_identifier.as_deref())
                .field(Field::SortBin, r.sort_bin.as_deref())
                .field(Field::PatronIdentifier, r.patron_identifier.as_deref())
                .field(Field::MediaType, r.media_type.as_ref().map(|m| m.code()))
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::PatronStatus(r) => {
            w.fixed(&r.patron_status.to_wire())
                .fixed(r.language.code())
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::PersonalName, &r.personal_name)
                .yes_no_field(Field::ValidPatron, r.valid_patron)
                .yes_no_field(Field::ValidPatronPassword, r.valid_patron_password)
                .field(Field::CurrencyType, r.currency_type.as_ref().map(|c| c.code()))
                .field(Field::FeeAmount, r.fee_amount.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::PatronInformation(r) => {
            w.fixed(&r.patron_status.to_wire())
                .fixed(r.language.code())
                .date(Some(&r.transaction_date))
                .number(count(r.hold_items_count), 4)
                .number(count(r.overdue_items_count), 4)
                .number(count(r.charged_items_count), 4)
                .number(count(r.fine_items_count), 4)
                .number(count(r.recall_items_count), 4)
                .number(count(r.unavailable_holds_count), 4)
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::PersonalName, &r.personal_name)
                .number_field(Field::HoldItemsLimit, count(r.hold_items_limit))
                .number_field(Field::OverdueItemsLimit, count(r.overdue_items_limit))
                .number_field(Field::ChargedItemsLimit, count(r.charged_items_limit))
                .yes_no_field(Field::ValidPatron, r.valid_patron)
                .yes_no_field(Field::ValidPatronPassword, r.valid_patron_password)
                .field(Field::CurrencyType, r.currency_type.as_ref().map(|c| c.code()))
                .field(Field::FeeAmount, r.fee_amount.as_deref())
                .field(Field::FeeLimit, r.fee_limit.as_deref())
                .repeated(Field::HoldItems, &r.hold_items)
                .repeated(Field::OverdueItems, &r.overdue_items)
                .repeated(Field::ChargedItems, &r.charged_items)
                .repeated(Field::FineItems, &r.fine_items)
                .repeated(Field::RecallItems, &r.recall_items)
                .repeated(Field::UnavailableHoldItems, &r.unavailable_hold_items)
                .field(Field::HomeAddress, r.home_address.as_deref())
                .field(Field::EmailAddress, r.email_address.as_deref())
                .field(Field::HomePhoneNumber, r.home_phone_number.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::EndSession(r) => {
            w.yes_no(r.end_session)
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::FeePaid(r) => {
            w.yes_no(r.payment_accepted)
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::TransactionId, r.transaction_id.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::ItemInformation(r) => {
            w.fixed(r.circulation_status.code())
                .fixed(r.security_marker.code())
                .fixed(r.fee_type.code())
                .date(Some(&r.transaction_date))
                .number_field(Field::HoldQueueLength, r.hold_queue_length)
                .date_field(Field::DueDate, r.due_date.as_ref())
                .date_field(Field::RecallDate, r.recall_date.as_ref())
                .date_field(Field::HoldPickupDate, r.hold_pickup_date.as_ref())
                .required(Field::ItemIdentifier, &r.item_identifier)
                .required(Field::TitleIdentifier, &r.title_identifier)
                .field(Field::Owner, r.owner.as_deref())
                .field(Field::CurrencyType, r.currency_type.as_ref().map(|c| c.code()))
                .field(Field::FeeAmount, r.fee_amount.as_deref())
                .field(Field::MediaType, r.media_type.as_ref().map(|m| m.code()))
                .field(Field::PermanentLocation, r.permanent_location.as_deref())
                .field(Field::CurrentLocation, r.current_location.as_deref())
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::Renew(r) => {
            w.ok(r.ok)
                .yes_no(r.renewal_ok)
                .tri_state(r.magnetic_media)
                .tri_state(r.desensitize)
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::ItemIdentifier, &r.item_identifier)
                .required(Field::TitleIdentifier, &r.title_identifier);
            match &r.due_date {
                Some(due) => w.date_field(Field::DueDate, Some(due)),
                None => w.required(Field::DueDate, ""),
            };
            w.field(Field::FeeType, r.fee_type.as_ref().map(|t| t.code()))
                .yes_no_field(Field::SecurityInhibit, r.security_inhibit)
                .field(Field::CurrencyType, r.currency_type.as_ref().map(|c| c.code()))
                .field(Field::FeeAmount, r.fee_amount.as_deref())
                .field(Field::MediaType, r.media_type.as_ref().map(|m| m.code()))
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .field(Field::TransactionId, r.transaction_id.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::RenewAll(r) => {
            w.ok(r.ok)
                .number(count(r.renewed_count), 4)
                .number(count(r.unrenewed_count), 4)
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .repeated(Field::RenewedItems, &r.renewed_items)
                .repeated(Field::UnrenewedItems, &r.unrenewed_items)
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::Hold(r) => {
            w.ok(r.ok)
                .yes_no(r.available)
                .date(Some(&r.transaction_date))
                .date_field(Field::ExpirationDate, r.expiration_date.as_ref())
                .number_field(Field::QueuePosition, r.queue_position)
                .field(Field::PickupLocation, r.pickup_location.as_deref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::ItemIdentifier, r.item_identifier.as_deref())
                .field(Field::TitleIdentifier, r.title_identifier.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::ItemStatusUpdate(r) => {
            w.ok(r.item_properties_ok)
                .date(Some(&r.transaction_date))
                .required(Field::ItemIdentifier, &r.item_identifier)
                .field(Field::TitleIdentifier, r.title_identifier.as_deref())
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
        Response::PatronEnable(r) => {
            w.fixed(&r.patron_status.to_wire())
                .fixed(r.language.code())
                .date(Some(&r.transaction_date))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::PersonalName, &r.personal_name)
                .yes_no_field(Field::ValidPatron, r.valid_patron)
                .yes_no_field(Field::ValidPatronPassword, r.valid_patron_password)
                .repeated(Field::ScreenMessage, &r.screen_message)
                .repeated(Field::PrintLine, &r.print_line);
        }
    }
    w.finish()
}

/// Renders a request as a self-check terminal would send it.
pub fn encode_request(request: &Request, delimiter: char, timezone: Tz) -> String {
    let command = request.command();
    let mut w = FieldWriter::new(command, delimiter, timezone);
    match request {
        Request::RequestAcsResend => return command.code().to_string(),
        Request::Login(r) => {
            w.fixed(&r.uid_algorithm.to_string())
                .fixed(&r.pwd_algorithm.to_string())
                .required(Field::LoginUserId, &r.login_user_id)
                .required(Field::LoginPassword, &r.login_password)
                .field(Field::LocationCode, r.location_code.as_deref());
        }
        Request::ScStatus(r) => {
            w.code(r.status_code.as_ref().map(|s| s.code()), 1)
                .number(r.max_print_width.map(u32::from), 3)
                .fixed(&format!("{:<4.4}", r.protocol_version));
        }
        Request::Checkout(r) => {
            w.yes_no(r.sc_renewal_policy)
                .yes_no(r.no_block)
                .date(r.transaction_date.as_ref())
                .date(r.nb_due_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::ItemIdentifier, &r.item_identifier)
                .required(Field::TerminalPassword, &r.terminal_password)
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .field(Field::PatronPassword, r.patron_password.as_deref())
                .yes_no_field(Field::FeeAcknowledged, r.fee_acknowledged)
                .yes_no_field(Field::Cancel, r.cancel);
        }
        Request::Checkin(r) => {
            w.yes_no(r.no_block)
                .date(r.transaction_date.as_ref())
                .date(r.return_date.as_ref())
                .required(Field::CurrentLocation, &r.current_location)
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::ItemIdentifier, &r.item_identifier)
                .required(Field::TerminalPassword, &r.terminal_password)
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .yes_no_field(Field::Cancel, r.cancel);
        }
        Request::PatronStatus(r) => {
            w.code(r.language.as_ref().map(|l| l.code()), 3)
                .date(r.transaction_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::TerminalPassword, &r.terminal_password)
                .required(Field::PatronPassword, &r.patron_password);
        }
        Request::PatronInformation(r) => {
            w.code(r.language.as_ref().map(|l| l.code()), 3)
                .date(r.transaction_date.as_ref())
                .fixed(&SummaryItem::to_summary(r.summary))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .field(Field::PatronPassword, r.patron_password.as_deref())
                .number_field(Field::StartItem, r.start_item)
                .number_field(Field::EndItem, r.end_item);
        }
        Request::EndPatronSession(r) => {
            w.date(r.transaction_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .field(Field::PatronPassword, r.patron_password.as_deref());
        }
        Request::FeePaid(r) => {
            w.date(r.transaction_date.as_ref())
                .code(r.fee_type.as_ref().map(|t| t.code()), 2)
                .code(r.payment_type.as_ref().map(|t| t.code()), 2)
                .code(r.currency_type.as_ref().map(|c| c.code()), 3)
                .required(Field::FeeAmount, &r.fee_amount)
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .field(Field::PatronPassword, r.patron_password.as_deref())
                .field(Field::FeeIdentifier, r.fee_identifier.as_deref())
                .field(Field::TransactionId, r.transaction_id.as_deref());
        }
        Request::ItemInformation(r) => {
            w.date(r.transaction_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::ItemIdentifier, &r.item_identifier)
                .field(Field::TerminalPassword, r.terminal_password.as_deref());
        }
        Request::Renew(r) => {
            w.yes_no(r.third_party_allowed)
                .yes_no(r.no_block)
                .date(r.transaction_date.as_ref())
                .date(r.nb_due_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::PatronPassword, r.patron_password.as_deref())
                .field(Field::ItemIdentifier, r.item_identifier.as_deref())
                .field(Field::TitleIdentifier, r.title_identifier.as_deref())
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .field(Field::ItemProperties, r.item_properties.as_deref())
                .yes_no_field(Field::FeeAcknowledged, r.fee_acknowledged);
        }
        Request::RenewAll(r) => {
            w.date(r.transaction_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::PatronPassword, r.patron_password.as_deref())
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .yes_no_field(Field::FeeAcknowledged, r.fee_acknowledged);
        }
        Request::BlockPatron(r) => {
            w.yes_no(r.card_retained)
                .date(r.transaction_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::BlockedCardMsg, &r.blocked_card_msg)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .required(Field::TerminalPassword, &r.terminal_password);
        }
        Request::Hold(r) => {
            w.code(r.hold_mode.as_ref().map(|m| m.code()), 1)
                .date(r.transaction_date.as_ref())
                .date_field(Field::ExpirationDate, r.expiration_date.as_ref())
                .field(Field::PickupLocation, r.pickup_location.as_deref())
                .field(Field::HoldType, r.hold_type.as_ref().map(|t| t.code()))
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::PatronPassword, r.patron_password.as_deref())
                .field(Field::ItemIdentifier, r.item_identifier.as_deref())
                .field(Field::TitleIdentifier, r.title_identifier.as_deref())
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .yes_no_field(Field::FeeAcknowledged, r.fee_acknowledged);
        }
        Request::ItemStatusUpdate(r) => {
            w.date(r.transaction_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::ItemIdentifier, &r.item_identifier)
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .required(Field::ItemProperties, &r.item_properties);
        }
        Request::PatronEnable(r) => {
            w.date(r.transaction_date.as_ref())
                .required(Field::InstitutionId, &r.institution_id)
                .required(Field::PatronIdentifier, &r.patron_identifier)
                .field(Field::TerminalPassword, r.terminal_password.as_deref())
                .field(Field::PatronPassword, r.patron_password.as_deref());
        }
    }
    w.finish()
}

