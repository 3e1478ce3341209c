// src/core/protocol/charset.rs

//! Single-byte and UTF-8 character sets used on the SIP2 wire.
//!
//! The checksum is computed over the encoded bytes, so every charset must
//! round-trip the characters it can represent byte-for-byte.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The upper half (0x80..=0xFF) of IBM code page 850.
const IBM850_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', 'ø', '£', 'Ø', '×', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '®', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', 'Á', 'Â', 'À', '©', '╣', '║', '╗', '╝', '¢', '¥', '┐', //
    '└', '┴', '┬', '├', '─', '┼', 'ã', 'Ã', '╚', '╔', '╩', '╦', '╠', '═', '╬', '¤', //
    'ð', 'Ð', 'Ê', 'Ë', 'È', 'ı', 'Í', 'Î', 'Ï', '┘', '┌', '█', '▄', '¦', 'Ì', '▀', //
    'Ó', 'ß', 'Ô', 'Ò', 'õ', 'Õ', 'µ', 'þ', 'Þ', 'Ú', 'Û', 'Ù', 'ý', 'Ý', '¯', '´', //
    '\u{AD}', '±', '‗', '¾', '¶', '§', '÷', '¸', '°', '¨', '·', '¹', '³', '²', '■', '\u{A0}',
];

/// Replacement byte for characters the charset cannot represent.
const REPLACEMENT: u8 = b'?';

/// A character set the gateway can speak on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    #[default]
    Ibm850,
    Iso8859_1,
    Utf8,
    Ascii,
}

impl Charset {
    /// The canonical configuration name of the charset.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Ibm850 => "IBM850",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Utf8 => "UTF-8",
            Charset::Ascii => "US-ASCII",
        }
    }

    /// Decodes wire bytes into a string. Never fails: bytes outside the
    /// charset become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Iso8859_1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
                .collect(),
            Charset::Ibm850 => bytes
                .iter()
                .map(|&b| {
                    if b < 0x80 {
                        b as char
                    } else {
                        IBM850_HIGH[(b - 0x80) as usize]
                    }
                })
                .collect(),
        }
    }

    /// Encodes a string into wire bytes, substituting `?` for characters the
    /// charset cannot represent.
    pub fn encode(&self, s: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(s.len());
        self.encode_into(s, &mut out);
        out
    }

    /// Appends the encoded form of `s` to `dst`.
    pub fn encode_into(&self, s: &str, dst: &mut Vec<u8>) {
        match self {
            Charset::Utf8 => dst.extend_from_slice(s.as_bytes()),
            _ => dst.extend(s.chars().map(|c| self.encode_char(c))),
        }
    }

    fn encode_char(&self, c: char) -> u8 {
        let code = c as u32;
        match self {
            Charset::Ascii if code < 0x80 => code as u8,
            Charset::Iso8859_1 if code < 0x100 => code as u8,
            Charset::Ibm850 if code < 0x80 => code as u8,
            Charset::Ibm850 => IBM850_HIGH
                .iter()
                .position(|&h| h == c)
                .map(|i| 0x80 + i as u8)
                .unwrap_or(REPLACEMENT),
            _ => REPLACEMENT,
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', "-");
        match normalized.as_str() {
            "IBM850" | "IBM-850" | "CP850" | "CP-850" => Ok(Charset::Ibm850),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Ok(Charset::Iso8859_1),
            "UTF-8" | "UTF8" => Ok(Charset::Utf8),
            "US-ASCII" | "ASCII" => Ok(Charset::Ascii),
            _ => Err(format!("unsupported charset '{s}'")),
        }
    }
}

impl TryFrom<String> for Charset {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Charset> for String {
    fn from(value: Charset) -> Self {
        value.name().to_string()
    }
}
