// tests/property/checksum_test.rs

//! Error-detection suffixes validate, and stop validating once the message
//! changes.

use proptest::prelude::*;
use sip2gate::core::protocol::Charset;
use sip2gate::core::protocol::checksum::{append_error_detection, byte_sum, verify};

fn message_body() -> impl Strategy<Value = String> {
    "9[0-9]{2}[A-Za-z0-9|]{8,60}"
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 300,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_appended_suffix_verifies(body in message_body(), seq in 0u8..10) {
        let mut line = body.clone();
        let checksum = append_error_detection(&mut line, Some(seq), Charset::Ibm850);

        let detection = verify(&line, Charset::Ibm850, false);
        prop_assert!(detection.valid, "{}", line);
        prop_assert_eq!(detection.sequence_number, Some(seq));
        prop_assert_eq!(detection.checksum, Some(checksum));
        prop_assert_eq!(byte_sum(&line[..line.len() - 4], Charset::Ibm850)
            .wrapping_add(u16::from_str_radix(&line[line.len() - 4..], 16).unwrap()), 0);
    }

    #[test]
    fn test_latin1_suffix_verifies(body in "9[0-9]{2}[a-z\u{e0}-\u{ff}|]{8,40}") {
        let mut line = body.clone();
        append_error_detection(&mut line, Some(1), Charset::Iso8859_1);
        prop_assert!(verify(&line, Charset::Iso8859_1, false).valid, "{}", line);
    }

    #[test]
    fn test_changed_byte_invalidates(
        body in message_body(),
        index in any::<prop::sample::Index>(),
        replacement in "[A-Za-z0-9]",
    ) {
        let mut line = body.clone();
        append_error_detection(&mut line, Some(0), Charset::Ibm850);

        let position = index.index(body.len());
        let original = &body[position..=position];
        prop_assume!(original != replacement);
        let mut tampered = line.clone();
        tampered.replace_range(position..=position, &replacement);

        prop_assert!(!verify(&tampered, Charset::Ibm850, false).valid, "{}", tampered);
    }
}
