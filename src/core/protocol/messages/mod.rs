// src/core/protocol/messages/mod.rs

//! Typed SIP2 message payloads, split by direction.

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;
