// src/core/protocol/decoder.rs

//! Turns one framed SIP2 line into an [`Envelope`].
//!
//! Decoding runs in three steps: the two-character command code is looked
//! up, the optional error-detection suffix is verified and stripped, and the
//! remaining body is read by the command's [`DecodeRequest`] implementation.
//! Fixed-width fields are read first; the variable field tail is then
//! consumed field by field until the input ends. Unknown field codes and
//! unparseable sub-values are logged and skipped. Only framing failures
//! (a missing delimiter or a body shorter than its fixed prefix) fail the
//! message.

use super::charset::Charset;
use super::checksum::{self, RESEND_SUFFIX_LEN, SUFFIX_LEN};
use super::command::Command;
use super::datetime::{DATE_TIME_WIDTH, parse_date_time};
use super::field::Field;
use super::messages::*;
use super::reader::Reader;
use super::types::{
    CurrencyType, FeeType, HoldMode, HoldType, Language, PaymentType, StatusCode, SummaryItem,
    lookup,
};
use crate::core::GatewayError;
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::{debug, warn};

/// Width of the command identifier at the start of every message.
pub const COMMAND_WIDTH: usize = 2;
/// Width of a variable field code.
pub const FIELD_CODE_WIDTH: usize = 2;

/// The per-session settings a line is decoded with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeContext {
    pub field_delimiter: char,
    pub charset: Charset,
    pub error_detection: bool,
    pub timezone: Tz,
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self {
            field_delimiter: '|',
            charset: Charset::default(),
            error_detection: false,
            timezone: Tz::UTC,
        }
    }
}

/// The structural wrapper around a decoded request.
///
/// An invalid envelope never carries a payload. `failure` records why the
/// envelope is invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub command: Command,
    pub sequence_number: Option<u8>,
    pub checksum: Option<String>,
    pub valid: bool,
    pub timezone: Tz,
    pub payload: Option<Request>,
    pub failure: Option<GatewayError>,
}

impl Envelope {
    fn invalid(
        command: Command,
        ctx: &DecodeContext,
        sequence_number: Option<u8>,
        checksum: Option<String>,
        failure: GatewayError,
    ) -> Self {
        Self {
            command,
            sequence_number,
            checksum,
            valid: false,
            timezone: ctx.timezone,
            payload: None,
            failure: Some(failure),
        }
    }
}

/// Decodes a single line (without its message delimiter).
pub fn decode(line: &str, ctx: &DecodeContext) -> Envelope {
    if line.chars().count() < COMMAND_WIDTH {
        return Envelope::invalid(
            Command::Unknown,
            ctx,
            None,
            None,
            GatewayError::UnknownCommand,
        );
    }
    let (code, body) = match Reader::new(line).take(COMMAND_WIDTH) {
        Ok(split) => split,
        Err(e) => return Envelope::invalid(Command::Unknown, ctx, None, None, e),
    };
    let command = Command::from_code(code);
    let is_resend = command == Command::RequestAcsResend;

    let (sequence_number, checksum_text, body) = if ctx.error_detection {
        let detection = checksum::verify(line, ctx.charset, is_resend);
        if !detection.valid {
            debug!("Error detection failed for '{}'", line);
            return Envelope::invalid(
                command,
                ctx,
                detection.sequence_number,
                detection.checksum,
                GatewayError::ErrorDetection,
            );
        }
        let suffix_len = if is_resend {
            RESEND_SUFFIX_LEN
        } else {
            SUFFIX_LEN
        };
        let end = line.len() - suffix_len;
        (
            detection.sequence_number,
            detection.checksum,
            &line[body.offset()..end],
        )
    } else {
        (None, None, body.remaining())
    };

    let payload = match command {
        Command::Unknown => Err(GatewayError::UnknownCommand),
        c if !c.is_request() => Err(GatewayError::UnsupportedCommand(c)),
        c => decode_request(c, body, ctx),
    };

    match payload {
        Ok(request) => Envelope {
            command,
            sequence_number,
            checksum: checksum_text,
            valid: true,
            timezone: ctx.timezone,
            payload: Some(request),
            failure: None,
        },
        Err(e) => {
            warn!("Failed to decode '{}' message: {}", command, e);
            Envelope::invalid(command, ctx, sequence_number, checksum_text, e)
        }
    }
}

/// Decodes a message body (command and suffix already stripped).
pub fn decode_request(
    command: Command,
    body: &str,
    ctx: &DecodeContext,
) -> Result<Request, GatewayError> {
    let request = match command {
        Command::Login => Request::Login(decode_body(body, ctx)?),
        Command::ScStatus => Request::ScStatus(decode_body(body, ctx)?),
        Command::Checkout => Request::Checkout(decode_body(body, ctx)?),
        Command::Checkin => Request::Checkin(decode_body(body, ctx)?),
        Command::PatronStatusRequest => Request::PatronStatus(decode_body(body, ctx)?),
        Command::PatronInformation => Request::PatronInformation(decode_body(body, ctx)?),
        Command::EndPatronSession => Request::EndPatronSession(decode_body(body, ctx)?),
        Command::FeePaid => Request::FeePaid(decode_body(body, ctx)?),
        Command::ItemInformation => Request::ItemInformation(decode_body(body, ctx)?),
        Command::Renew => Request::Renew(decode_body(body, ctx)?),
        Command::RenewAll => Request::RenewAll(decode_body(body, ctx)?),
        Command::BlockPatron => Request::BlockPatron(decode_body(body, ctx)?),
        Command::Hold => Request::Hold(decode_body(body, ctx)?),
        Command::ItemStatusUpdate => Request::ItemStatusUpdate(decode_body(body, ctx)?),
        Command::PatronEnable => Request::PatronEnable(decode_body(body, ctx)?),
        Command::RequestAcsResend => Request::RequestAcsResend,
        other => return Err(GatewayError::UnsupportedCommand(other)),
    };
    Ok(request)
}

/// A request payload that knows its own fixed prefix and variable fields.
pub trait DecodeRequest: Default {
    /// Reads the fixed-width prefix and returns the reader positioned at the
    /// first variable field.
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError>;

    /// Stores one variable field. Fields the message does not define are ignored.
    fn apply_field(&mut self, field: Field, value: &str, ctx: &DecodeContext);
}

fn decode_body<T: DecodeRequest>(body: &str, ctx: &DecodeContext) -> Result<T, GatewayError> {
    let mut target = T::default();
    let mut reader = target.decode_fixed(Reader::new(body), ctx)?;

    while !reader.is_at_end() {
        // Tolerate an empty segment, e.g. the trailing delimiter of a
        // message without variable fields.
        if reader.remaining().starts_with(ctx.field_delimiter) {
            let (_, next) = reader.take(1)?;
            reader = next;
            continue;
        }
        let (code, next) = reader.take(FIELD_CODE_WIDTH)?;
        let (value, next) = next.take_until(ctx.field_delimiter)?;
        let field = Field::from_code(code);
        if field != Field::Unknown {
            target.apply_field(field, value, ctx);
        }
        reader = next;
    }
    Ok(target)
}

// --- Fixed-field helpers ---

fn flag(reader: Reader<'_>) -> Result<(bool, Reader<'_>), GatewayError> {
    let (c, reader) = reader.take(1)?;
    Ok((c == "Y" || c == "y", reader))
}

fn character(reader: Reader<'_>) -> Result<(char, Reader<'_>), GatewayError> {
    let (c, reader) = reader.take(1)?;
    Ok((c.chars().next().unwrap_or(' '), reader))
}

fn date<'a>(
    reader: Reader<'a>,
    ctx: &DecodeContext,
) -> Result<(Option<DateTime<FixedOffset>>, Reader<'a>), GatewayError> {
    let (s, reader) = reader.take(DATE_TIME_WIDTH)?;
    Ok((parse_date_time(s, ctx.timezone), reader))
}

fn code<'a, T>(
    reader: Reader<'a>,
    width: usize,
    kind: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<(Option<T>, Reader<'a>), GatewayError> {
    let (s, reader) = reader.take(width)?;
    if s.trim().is_empty() {
        return Ok((None, reader));
    }
    Ok((lookup(kind, s, parse), reader))
}

fn number<'a, T: FromStr>(
    reader: Reader<'a>,
    width: usize,
    kind: &str,
) -> Result<(Option<T>, Reader<'a>), GatewayError> {
    let (s, reader) = reader.take(width)?;
    Ok((parse_number(kind, s), reader))
}

// --- Variable-field helpers ---

fn parse_number<T: FromStr>(kind: &str, s: &str) -> Option<T> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Unparseable {} '{}', ignoring", kind, s);
            None
        }
    }
}

fn yes_no(value: &str) -> Option<bool> {
    match value.chars().next() {
        Some('Y' | 'y') => Some(true),
        Some('N' | 'n') => Some(false),
        _ => None,
    }
}

fn ignored(command: &str, field: Field) {
    debug!("Field '{}' is not defined for {}, ignoring", field, command);
}

// --- Per-command layouts ---

impl DecodeRequest for Login {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        _ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (uid, reader) = character(reader)?;
        let (pwd, reader) = character(reader)?;
        self.uid_algorithm = uid;
        self.pwd_algorithm = pwd;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::LoginUserId => self.login_user_id = value.to_string(),
            Field::LoginPassword => self.login_password = value.to_string(),
            Field::LocationCode => self.location_code = Some(value.to_string()),
            other => ignored("login", other),
        }
    }
}

impl DecodeRequest for ScStatus {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        _ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (status_code, reader) = code(reader, 1, "status", StatusCode::parse)?;
        let (max_print_width, reader) = number(reader, 3, "max print width")?;
        let (version, reader) = reader.take(4)?;
        self.status_code = status_code;
        self.max_print_width = max_print_width;
        self.protocol_version = version.to_string();
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, _value: &str, _ctx: &DecodeContext) {
        ignored("sc-status", field);
    }
}

impl DecodeRequest for Checkout {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (sc_renewal_policy, reader) = flag(reader)?;
        let (no_block, reader) = flag(reader)?;
        let (transaction_date, reader) = date(reader, ctx)?;
        let (nb_due_date, reader) = date(reader, ctx)?;
        self.sc_renewal_policy = sc_renewal_policy;
        self.no_block = no_block;
        self.transaction_date = transaction_date;
        self.nb_due_date = nb_due_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::ItemIdentifier => self.item_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = value.to_string(),
            Field::ItemProperties => self.item_properties = Some(value.to_string()),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            Field::FeeAcknowledged => self.fee_acknowledged = yes_no(value),
            Field::Cancel => self.cancel = yes_no(value),
            other => ignored("checkout", other),
        }
    }
}

impl DecodeRequest for Checkin {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (no_block, reader) = flag(reader)?;
        let (transaction_date, reader) = date(reader, ctx)?;
        let (return_date, reader) = date(reader, ctx)?;
        self.no_block = no_block;
        self.transaction_date = transaction_date;
        self.return_date = return_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::CurrentLocation => self.current_location = value.to_string(),
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::ItemIdentifier => self.item_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = value.to_string(),
            Field::ItemProperties => self.item_properties = Some(value.to_string()),
            Field::Cancel => self.cancel = yes_no(value),
            other => ignored("checkin", other),
        }
    }
}

impl DecodeRequest for PatronStatusRequest {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (language, reader) = code(reader, 3, "language", Language::parse)?;
        let (transaction_date, reader) = date(reader, ctx)?;
        self.language = language;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = value.to_string(),
            Field::PatronPassword => self.patron_password = value.to_string(),
            other => ignored("patron-status", other),
        }
    }
}

impl DecodeRequest for PatronInformation {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (language, reader) = code(reader, 3, "language", Language::parse)?;
        let (transaction_date, reader) = date(reader, ctx)?;
        let (summary, reader) = reader.take(10)?;
        self.language = language;
        self.transaction_date = transaction_date;
        self.summary = SummaryItem::from_summary(summary);
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            Field::StartItem => self.start_item = parse_number("start item", value),
            Field::EndItem => self.end_item = parse_number("end item", value),
            other => ignored("patron-information", other),
        }
    }
}

impl DecodeRequest for EndPatronSession {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (transaction_date, reader) = date(reader, ctx)?;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            other => ignored("end-patron-session", other),
        }
    }
}

impl DecodeRequest for FeePaid {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (transaction_date, reader) = date(reader, ctx)?;
        let (fee_type, reader) = code(reader, 2, "fee type", FeeType::parse)?;
        let (payment_type, reader) = code(reader, 2, "payment type", PaymentType::parse)?;
        let (currency_type, reader) = code(reader, 3, "currency", CurrencyType::parse)?;
        self.transaction_date = transaction_date;
        self.fee_type = fee_type;
        self.payment_type = payment_type;
        self.currency_type = currency_type;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::FeeAmount => self.fee_amount = value.to_string(),
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            Field::FeeIdentifier => self.fee_identifier = Some(value.to_string()),
            Field::TransactionId => self.transaction_id = Some(value.to_string()),
            other => ignored("fee-paid", other),
        }
    }
}

impl DecodeRequest for ItemInformation {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (transaction_date, reader) = date(reader, ctx)?;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::ItemIdentifier => self.item_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            other => ignored("item-information", other),
        }
    }
}

impl DecodeRequest for Renew {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (third_party_allowed, reader) = flag(reader)?;
        let (no_block, reader) = flag(reader)?;
        let (transaction_date, reader) = date(reader, ctx)?;
        let (nb_due_date, reader) = date(reader, ctx)?;
        self.third_party_allowed = third_party_allowed;
        self.no_block = no_block;
        self.transaction_date = transaction_date;
        self.nb_due_date = nb_due_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            Field::ItemIdentifier => self.item_identifier = Some(value.to_string()),
            Field::TitleIdentifier => self.title_identifier = Some(value.to_string()),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::ItemProperties => self.item_properties = Some(value.to_string()),
            Field::FeeAcknowledged => self.fee_acknowledged = yes_no(value),
            other => ignored("renew", other),
        }
    }
}

impl DecodeRequest for RenewAll {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (transaction_date, reader) = date(reader, ctx)?;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::FeeAcknowledged => self.fee_acknowledged = yes_no(value),
            other => ignored("renew-all", other),
        }
    }
}

impl DecodeRequest for BlockPatron {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (card_retained, reader) = flag(reader)?;
        let (transaction_date, reader) = date(reader, ctx)?;
        self.card_retained = card_retained;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::BlockedCardMsg => self.blocked_card_msg = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = value.to_string(),
            other => ignored("block-patron", other),
        }
    }
}

impl DecodeRequest for Hold {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (hold_mode, reader) = code(reader, 1, "hold mode", HoldMode::parse)?;
        let (transaction_date, reader) = date(reader, ctx)?;
        self.hold_mode = hold_mode;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, ctx: &DecodeContext) {
        match field {
            Field::ExpirationDate => self.expiration_date = parse_date_time(value, ctx.timezone),
            Field::PickupLocation => self.pickup_location = Some(value.to_string()),
            Field::HoldType => self.hold_type = lookup("hold type", value, HoldType::parse),
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            Field::ItemIdentifier => self.item_identifier = Some(value.to_string()),
            Field::TitleIdentifier => self.title_identifier = Some(value.to_string()),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::FeeAcknowledged => self.fee_acknowledged = yes_no(value),
            other => ignored("hold", other),
        }
    }
}

impl DecodeRequest for ItemStatusUpdate {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (transaction_date, reader) = date(reader, ctx)?;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::ItemIdentifier => self.item_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::ItemProperties => self.item_properties = value.to_string(),
            other => ignored("item-status-update", other),
        }
    }
}

impl DecodeRequest for PatronEnable {
    fn decode_fixed<'a>(
        &mut self,
        reader: Reader<'a>,
        ctx: &DecodeContext,
    ) -> Result<Reader<'a>, GatewayError> {
        let (transaction_date, reader) = date(reader, ctx)?;
        self.transaction_date = transaction_date;
        Ok(reader)
    }

    fn apply_field(&mut self, field: Field, value: &str, _ctx: &DecodeContext) {
        match field {
            Field::InstitutionId => self.institution_id = value.to_string(),
            Field::PatronIdentifier => self.patron_identifier = value.to_string(),
            Field::TerminalPassword => self.terminal_password = Some(value.to_string()),
            Field::PatronPassword => self.patron_password = Some(value.to_string()),
            other => ignored("patron-enable", other),
        }
    }
}
