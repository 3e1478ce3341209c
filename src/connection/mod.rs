// src/connection/mod.rs

//! Manages the lifecycle of a single self-check terminal connection,
//! including framing, decoding, dispatch and session state.

// Declare the private sub-modules of the `connection` module.
mod guard;
mod handler;
mod session;

// Publicly re-export the primary types from the sub-modules.
pub use guard::ConnectionGuard;
pub use handler::{ConnectionHandler, ConnectionState};
pub use session::{
    LoginCredentials, PatronCredentials, PreviousExchange, SessionInfo, SessionState,
};
