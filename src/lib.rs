// src/lib.rs

//! sip2gate: a SIP2 gateway between library self-check terminals and an
//! integrated library system.

pub mod config;
pub mod connection;
pub mod core;
pub mod server;
