// src/core/protocol/codec.rs

//! Framing for the SIP2 byte stream: one message per delimiter-terminated
//! line, converted to and from text with the session charset.

use super::charset::Charset;
use crate::core::GatewayError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on a single frame, delimiter excluded.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// A `tokio_util::codec` that splits on a single-byte message delimiter.
#[derive(Debug, Clone)]
pub struct Sip2Codec {
    delimiter: u8,
    charset: Charset,
    max_length: usize,
}

impl Sip2Codec {
    pub fn new(message_delimiter: char, charset: Charset) -> Self {
        let delimiter = charset
            .encode(&message_delimiter.to_string())
            .first()
            .copied()
            .unwrap_or(b'\r');
        Self {
            delimiter,
            charset,
            max_length: MAX_FRAME_LENGTH,
        }
    }

    /// Overrides the maximum frame length.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }
}

impl Decoder for Sip2Codec {
    type Item = String;
    type Error = GatewayError;

    /// Yields the next complete line without its delimiter. A leading `\n`
    /// left over from a CR LF terminator is dropped.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.first() == Some(&b'\n') {
            src.advance(1);
        }
        match src.iter().position(|&b| b == self.delimiter) {
            Some(pos) => {
                if pos > self.max_length {
                    return Err(GatewayError::FrameTooLong(self.max_length));
                }
                let frame = src.split_to(pos + 1);
                Ok(Some(self.charset.decode(&frame[..pos])))
            }
            None if src.len() > self.max_length => {
                Err(GatewayError::FrameTooLong(self.max_length))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<String> for Sip2Codec {
    type Error = GatewayError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = self.charset.encode(&item);
        dst.reserve(bytes.len() + 1);
        dst.extend_from_slice(&bytes);
        dst.extend_from_slice(&[self.delimiter]);
        Ok(())
    }
}
