// src/core/state/mod.rs

//! Defines `GatewayState`, the read-only state shared by every connection task.

use crate::config::Config;
use crate::core::handler::HandlerRegistry;
use crate::core::tenant::{TenantResolutionEngine, TenantStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything a connection needs from the rest of the gateway. Connections
/// hold it behind an `Arc`; the only mutable part is the tenant snapshot
/// inside [`TenantStore`].
#[derive(Debug)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub tenants: Arc<TenantStore>,
    pub engine: Arc<TenantResolutionEngine>,
    pub handlers: Arc<HandlerRegistry>,
    next_session_id: AtomicU64,
}

impl GatewayState {
    pub fn new(
        config: Arc<Config>,
        tenants: Arc<TenantStore>,
        engine: Arc<TenantResolutionEngine>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            config,
            tenants,
            engine,
            handlers,
            next_session_id: AtomicU64::new(0),
        }
    }

    /// Allocates the id of a new connection.
    pub fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}
