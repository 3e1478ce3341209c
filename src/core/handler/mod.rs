// src/core/handler/mod.rs

//! Dispatch of decoded requests to their handlers and the backend seam.

pub mod backend;
pub mod commands;
pub mod registry;

pub use backend::{BackendCall, HttpIlsBackend, IlsBackend};
pub use registry::{CommandHandler, HandlerRegistry};
