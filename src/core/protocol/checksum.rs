// src/core/protocol/checksum.rs

//! Error detection: the optional `AY<seq>AZ<checksum>` message suffix.
//!
//! The checksum is the 16-bit two's complement of the unsigned byte-sum of
//! the message up to and including `AZ`, so that adding the checksum to that
//! sum yields zero modulo 2^16.

use super::charset::Charset;

/// Suffix length for all commands except Request ACS Resend: `AY` digit `AZ` 4-hex.
pub const SUFFIX_LEN: usize = 9;
/// Suffix length for Request ACS Resend: `AZ` 4-hex.
pub const RESEND_SUFFIX_LEN: usize = 6;
/// Minimum message length when error detection is enabled.
pub const MIN_LEN: usize = 11;
/// Minimum Request ACS Resend length when error detection is enabled.
pub const RESEND_MIN_LEN: usize = 8;

const CHECKSUM_DIGITS: usize = 4;

/// The outcome of validating an error-detection suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetection {
    pub valid: bool,
    pub sequence_number: Option<u8>,
    pub checksum: Option<String>,
}

impl ErrorDetection {
    fn invalid(sequence_number: Option<u8>, checksum: Option<String>) -> Self {
        Self {
            valid: false,
            sequence_number,
            checksum,
        }
    }
}

/// Sums the charset-encoded bytes of `s` into 16 bits.
pub fn byte_sum(s: &str, charset: Charset) -> u16 {
    charset
        .encode(s)
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Computes the checksum for a message that already ends in `AZ`.
pub fn compute_checksum(message_through_az: &str, charset: Charset) -> u16 {
    byte_sum(message_through_az, charset).wrapping_neg()
}

/// Renders a checksum as four upper-case hex digits.
pub fn format_checksum(checksum: u16) -> String {
    format!("{checksum:04X}")
}

/// Validates the suffix of a raw message.
///
/// `is_resend` selects the short `AZ`-only layout used by Request ACS Resend.
pub fn verify(message: &str, charset: Charset, is_resend: bool) -> ErrorDetection {
    let (min_len, suffix_len) = if is_resend {
        (RESEND_MIN_LEN, RESEND_SUFFIX_LEN)
    } else {
        (MIN_LEN, SUFFIX_LEN)
    };
    if message.chars().count() < min_len {
        return ErrorDetection::invalid(None, None);
    }

    let split = message.len() - suffix_len;
    if !message.is_char_boundary(split) || !message[split..].is_ascii() {
        return ErrorDetection::invalid(None, None);
    }
    let suffix = &message[split..];

    let (sequence_number, az_part) = if is_resend {
        (None, suffix)
    } else {
        let (ay_part, az_part) = suffix.split_at(3);
        if !ay_part.starts_with("AY") {
            return ErrorDetection::invalid(None, None);
        }
        match ay_part[2..].chars().next().and_then(|c| c.to_digit(10)) {
            Some(seq) => (Some(seq as u8), az_part),
            None => return ErrorDetection::invalid(None, None),
        }
    };

    if !az_part.starts_with("AZ") {
        return ErrorDetection::invalid(sequence_number, None);
    }
    let checksum_text = &az_part[2..];
    if !checksum_text.chars().all(|c| c.is_ascii_hexdigit()) {
        return ErrorDetection::invalid(sequence_number, None);
    }
    let Ok(checksum) = u16::from_str_radix(checksum_text, 16) else {
        return ErrorDetection::invalid(sequence_number, None);
    };

    let summed = &message[..message.len() - CHECKSUM_DIGITS];
    let valid = byte_sum(summed, charset).wrapping_add(checksum) == 0;
    ErrorDetection {
        valid,
        sequence_number,
        checksum: Some(checksum_text.to_string()),
    }
}

/// Appends `AY<seq>AZ<checksum>` (or `AZ<checksum>` when `sequence_number`
/// is `None`) to a rendered message and returns the checksum text.
pub fn append_error_detection(
    line: &mut String,
    sequence_number: Option<u8>,
    charset: Charset,
) -> String {
    if let Some(seq) = sequence_number {
        line.push_str("AY");
        line.push_str(&(seq % 10).to_string());
    }
    line.push_str("AZ");
    let checksum = format_checksum(compute_checksum(line, charset));
    line.push_str(&checksum);
    checksum
}
