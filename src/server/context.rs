// src/server/context.rs

use crate::core::state::GatewayState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing_subscriber::{filter::EnvFilter, reload};

/// Handle used to swap the log filter at runtime.
pub type LogReloadHandle = Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>;

/// Holds all the initialized state required to run the gateway's main loop.
pub struct ServerContext {
    pub state: Arc<GatewayState>,
    /// One listener per entry of `Config::listen_ports`, all served by the same loop.
    pub listeners: Vec<TcpListener>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
    pub acceptor: Option<TlsAcceptor>,
    /// One permit per concurrently served connection (`max_clients`).
    pub connection_permits: Arc<Semaphore>,
    /// The file the configuration was loaded from, re-read on SIGHUP.
    pub config_path: String,
    pub log_reload_handle: LogReloadHandle,
}
