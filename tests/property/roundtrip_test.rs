// tests/property/roundtrip_test.rs

//! Requests rendered by the encoder decode back to the same payload, for
//! every request the gateway accepts.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use sip2gate::core::protocol::messages::{
    BlockPatron, Checkin, Checkout, EndPatronSession, FeePaid, Hold, ItemInformation,
    ItemStatusUpdate, Login, PatronEnable, PatronInformation, PatronStatusRequest, Renew, RenewAll,
    ScStatus,
};
use sip2gate::core::protocol::types::{
    CurrencyType, FeeType, HoldMode, HoldType, Language, PaymentType, StatusCode, SummaryItem,
};
use sip2gate::core::protocol::{DecodeContext, Request, decode, encode_request};
use strum::IntoEnumIterator;

// 2000-01-01 through 2099-12-31, whole seconds.
fn timestamp() -> impl Strategy<Value = Option<DateTime<FixedOffset>>> {
    prop::option::of(
        (946_684_800i64..4_102_444_799i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap().fixed_offset()),
    )
}

fn value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.-]{0,24}"
}

fn optional_value() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[A-Za-z0-9_.-]{1,24}")
}

// Zones without daylight saving, so every local time maps to one instant.
fn zone() -> impl Strategy<Value = Tz> {
    prop::sample::select(vec![Tz::UTC, Tz::Asia__Tokyo, Tz::Asia__Kolkata])
}

/// Any value of a code table, or none.
fn code<T: IntoEnumIterator + Clone + std::fmt::Debug + 'static>() -> impl Strategy<Value = Option<T>> {
    prop::option::of(prop::sample::select(T::iter().collect::<Vec<_>>()))
}

fn flag() -> impl Strategy<Value = Option<bool>> {
    prop::option::of(any::<bool>())
}

fn context(field_delimiter: char, timezone: Tz) -> DecodeContext {
    DecodeContext {
        field_delimiter,
        timezone,
        ..DecodeContext::default()
    }
}

fn roundtrip(request: &Request, ctx: &DecodeContext) -> Option<Request> {
    let line = encode_request(request, ctx.field_delimiter, ctx.timezone);
    let envelope = decode(&line, ctx);
    assert!(envelope.valid, "'{line}' failed: {:?}", envelope.failure);
    envelope.payload
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_login_roundtrip(
        uid_algorithm in prop::sample::select(vec!['0', '1', '2']),
        pwd_algorithm in prop::sample::select(vec!['0', '1', '2']),
        login_user_id in value(),
        login_password in value(),
        location_code in optional_value(),
        delimiter in prop::sample::select(vec!['|', '^', '~']),
    ) {
        let request = Request::Login(Login {
            uid_algorithm,
            pwd_algorithm,
            login_user_id,
            login_password,
            location_code,
        });
        let decoded = roundtrip(&request, &context(delimiter, Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_checkout_roundtrip(
        sc_renewal_policy in any::<bool>(),
        no_block in any::<bool>(),
        transaction_date in timestamp(),
        nb_due_date in timestamp(),
        institution_id in value(),
        patron_identifier in value(),
        item_identifier in value(),
        terminal_password in value(),
        item_properties in optional_value(),
        patron_password in optional_value(),
        fee_acknowledged in prop::option::of(any::<bool>()),
        cancel in prop::option::of(any::<bool>()),
        timezone in zone(),
    ) {
        let request = Request::Checkout(Checkout {
            sc_renewal_policy,
            no_block,
            transaction_date,
            nb_due_date,
            institution_id,
            patron_identifier,
            item_identifier,
            terminal_password,
            item_properties,
            patron_password,
            fee_acknowledged,
            cancel,
        });
        let decoded = roundtrip(&request, &context('|', timezone));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_checkin_roundtrip(
        no_block in any::<bool>(),
        transaction_date in timestamp(),
        return_date in timestamp(),
        current_location in value(),
        institution_id in value(),
        item_identifier in value(),
        terminal_password in value(),
        item_properties in optional_value(),
        cancel in prop::option::of(any::<bool>()),
    ) {
        let request = Request::Checkin(Checkin {
            no_block,
            transaction_date,
            return_date,
            current_location,
            institution_id,
            item_identifier,
            terminal_password,
            item_properties,
            cancel,
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_patron_status_roundtrip(
        transaction_date in timestamp(),
        institution_id in value(),
        patron_identifier in value(),
        terminal_password in value(),
        patron_password in value(),
    ) {
        let request = Request::PatronStatus(PatronStatusRequest {
            language: None,
            transaction_date,
            institution_id,
            patron_identifier,
            terminal_password,
            patron_password,
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_sc_status_roundtrip(
        status_code in code::<StatusCode>(),
        max_print_width in prop::option::of(0u16..=999),
        protocol_version in prop::sample::select(vec!["1.00", "2.00"]),
    ) {
        let request = Request::ScStatus(ScStatus {
            status_code,
            max_print_width,
            protocol_version: protocol_version.to_string(),
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_patron_information_roundtrip(
        language in code::<Language>(),
        transaction_date in timestamp(),
        summary in code::<SummaryItem>(),
        institution_id in value(),
        patron_identifier in value(),
        (terminal_password, patron_password) in (optional_value(), optional_value()),
        start_item in prop::option::of(0u32..10_000),
        end_item in prop::option::of(0u32..10_000),
        timezone in zone(),
    ) {
        let request = Request::PatronInformation(PatronInformation {
            language,
            transaction_date,
            summary,
            institution_id,
            patron_identifier,
            terminal_password,
            patron_password,
            start_item,
            end_item,
        });
        let decoded = roundtrip(&request, &context('|', timezone));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_end_patron_session_roundtrip(
        transaction_date in timestamp(),
        institution_id in value(),
        patron_identifier in value(),
        terminal_password in optional_value(),
        patron_password in optional_value(),
    ) {
        let request = Request::EndPatronSession(EndPatronSession {
            transaction_date,
            institution_id,
            patron_identifier,
            terminal_password,
            patron_password,
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_fee_paid_roundtrip(
        transaction_date in timestamp(),
        (fee_type, payment_type, currency_type) in
            (code::<FeeType>(), code::<PaymentType>(), code::<CurrencyType>()),
        fee_amount in "[0-9]{1,4}\\.[0-9]{2}",
        institution_id in value(),
        patron_identifier in value(),
        (terminal_password, patron_password) in (optional_value(), optional_value()),
        (fee_identifier, transaction_id) in (optional_value(), optional_value()),
    ) {
        let request = Request::FeePaid(FeePaid {
            transaction_date,
            fee_type,
            payment_type,
            currency_type,
            fee_amount,
            institution_id,
            patron_identifier,
            terminal_password,
            patron_password,
            fee_identifier,
            transaction_id,
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_item_information_roundtrip(
        transaction_date in timestamp(),
        institution_id in value(),
        item_identifier in value(),
        terminal_password in optional_value(),
        delimiter in prop::sample::select(vec!['|', '^', '~']),
    ) {
        let request = Request::ItemInformation(ItemInformation {
            transaction_date,
            institution_id,
            item_identifier,
            terminal_password,
        });
        let decoded = roundtrip(&request, &context(delimiter, Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_renew_roundtrip(
        (third_party_allowed, no_block) in (any::<bool>(), any::<bool>()),
        (transaction_date, nb_due_date) in (timestamp(), timestamp()),
        institution_id in value(),
        patron_identifier in value(),
        (patron_password, terminal_password) in (optional_value(), optional_value()),
        (item_identifier, title_identifier) in (optional_value(), optional_value()),
        item_properties in optional_value(),
        fee_acknowledged in flag(),
        timezone in zone(),
    ) {
        let request = Request::Renew(Renew {
            third_party_allowed,
            no_block,
            transaction_date,
            nb_due_date,
            institution_id,
            patron_identifier,
            patron_password,
            item_identifier,
            title_identifier,
            terminal_password,
            item_properties,
            fee_acknowledged,
        });
        let decoded = roundtrip(&request, &context('|', timezone));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_renew_all_roundtrip(
        transaction_date in timestamp(),
        institution_id in value(),
        patron_identifier in value(),
        patron_password in optional_value(),
        terminal_password in optional_value(),
        fee_acknowledged in flag(),
    ) {
        let request = Request::RenewAll(RenewAll {
            transaction_date,
            institution_id,
            patron_identifier,
            patron_password,
            terminal_password,
            fee_acknowledged,
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_block_patron_roundtrip(
        card_retained in any::<bool>(),
        transaction_date in timestamp(),
        institution_id in value(),
        blocked_card_msg in "[A-Za-z0-9.,!-]{0,40}",
        patron_identifier in value(),
        terminal_password in value(),
    ) {
        let request = Request::BlockPatron(BlockPatron {
            card_retained,
            transaction_date,
            institution_id,
            blocked_card_msg,
            patron_identifier,
            terminal_password,
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_hold_roundtrip(
        (hold_mode, hold_type) in (code::<HoldMode>(), code::<HoldType>()),
        (transaction_date, expiration_date) in (timestamp(), timestamp()),
        pickup_location in optional_value(),
        institution_id in value(),
        patron_identifier in value(),
        (patron_password, terminal_password) in (optional_value(), optional_value()),
        (item_identifier, title_identifier) in (optional_value(), optional_value()),
        fee_acknowledged in flag(),
        timezone in zone(),
    ) {
        let request = Request::Hold(Hold {
            hold_mode,
            transaction_date,
            expiration_date,
            pickup_location,
            hold_type,
            institution_id,
            patron_identifier,
            patron_password,
            item_identifier,
            title_identifier,
            terminal_password,
            fee_acknowledged,
        });
        let decoded = roundtrip(&request, &context('|', timezone));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_item_status_update_roundtrip(
        transaction_date in timestamp(),
        institution_id in value(),
        item_identifier in value(),
        terminal_password in optional_value(),
        item_properties in value(),
    ) {
        let request = Request::ItemStatusUpdate(ItemStatusUpdate {
            transaction_date,
            institution_id,
            item_identifier,
            terminal_password,
            item_properties,
        });
        let decoded = roundtrip(&request, &context('|', Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_patron_enable_roundtrip(
        transaction_date in timestamp(),
        institution_id in value(),
        patron_identifier in value(),
        terminal_password in optional_value(),
        patron_password in optional_value(),
        delimiter in prop::sample::select(vec!['|', '^', '~']),
    ) {
        let request = Request::PatronEnable(PatronEnable {
            transaction_date,
            institution_id,
            patron_identifier,
            terminal_password,
            patron_password,
        });
        let decoded = roundtrip(&request, &context(delimiter, Tz::UTC));
        prop_assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_decode_never_panics(line in "\\PC{0,120}", error_detection in any::<bool>()) {
        let ctx = DecodeContext {
            error_detection,
            ..DecodeContext::default()
        };
        let envelope = decode(&line, &ctx);
        prop_assert!(envelope.valid || envelope.payload.is_none());
        prop_assert_eq!(envelope.valid, envelope.failure.is_none());
    }
}
