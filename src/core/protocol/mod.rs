// src/core/protocol/mod.rs

//! The SIP2 codec: command and field tables, the line decoder and encoder,
//! error detection and stream framing.

pub mod charset;
pub mod checksum;
pub mod codec;
pub mod command;
pub mod datetime;
pub mod decoder;
pub mod encoder;
pub mod field;
pub mod messages;
pub mod reader;
pub mod types;

pub use charset::Charset;
pub use codec::{MAX_FRAME_LENGTH, Sip2Codec};
pub use command::Command;
pub use decoder::{DecodeContext, Envelope, decode};
pub use encoder::{encode_request, encode_response};
pub use field::Field;
pub use messages::{Request, Response};
