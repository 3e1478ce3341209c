// src/core/protocol/reader.rs

//! An explicit cursor over a decoded SIP2 line.
//!
//! `Reader` is a small `Copy` value: every read returns the consumed slice
//! together with the advanced reader, and the caller threads the new reader
//! forward. Offsets are byte offsets that always sit on a char boundary.

use crate::core::GatewayError;

/// A read position within an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reader<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    /// The current byte offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The unread tail of the input.
    pub fn remaining(&self) -> &'a str {
        &self.input[self.offset..]
    }

    /// True when every character has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// Consumes exactly `count` characters.
    pub fn take(self, count: usize) -> Result<(&'a str, Reader<'a>), GatewayError> {
        let rest = self.remaining();
        let end = match rest.char_indices().nth(count) {
            Some((idx, _)) => idx,
            None if rest.chars().count() == count => rest.len(),
            None => {
                return Err(GatewayError::FrameTooShort {
                    offset: self.offset,
                    needed: count,
                });
            }
        };
        Ok((
            &rest[..end],
            Reader {
                input: self.input,
                offset: self.offset + end,
            },
        ))
    }

    /// Consumes characters up to `delimiter`, returning them without the
    /// delimiter. The delimiter itself is consumed as well.
    pub fn take_until(self, delimiter: char) -> Result<(&'a str, Reader<'a>), GatewayError> {
        let rest = self.remaining();
        match rest.find(delimiter) {
            Some(idx) => Ok((
                &rest[..idx],
                Reader {
                    input: self.input,
                    offset: self.offset + idx + delimiter.len_utf8(),
                },
            )),
            None => Err(GatewayError::MissingDelimiter {
                offset: self.offset,
            }),
        }
    }
}
