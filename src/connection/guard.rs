// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use crate::core::metrics;
use std::net::SocketAddr;
use tracing::debug;

/// An RAII guard to ensure the connected-clients gauge is always decremented
/// when a connection handler's scope is exited, however the loop ended.
pub struct ConnectionGuard {
    /// The unique identifier for the client session.
    pub(crate) session_id: u64,
    /// The network address of the client.
    pub(crate) addr: SocketAddr,
}

impl ConnectionGuard {
    /// Creates a new `ConnectionGuard` and counts the connection as connected.
    pub(crate) fn new(session_id: u64, addr: SocketAddr) -> Self {
        metrics::CONNECTED_CLIENTS.inc();
        Self { session_id, addr }
    }
}

impl Drop for ConnectionGuard {
    /// Releases the connection's share of the gauge. The session state itself
    /// is owned by the handler and dropped with it.
    fn drop(&mut self) {
        metrics::CONNECTED_CLIENTS.dec();
        debug!(
            "ConnectionGuard dropping, session {} from {} is closed.",
            self.session_id, self.addr
        );
    }
}
