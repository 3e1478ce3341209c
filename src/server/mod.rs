// src/server/mod.rs

//! Listener setup, the accept loop and the metrics endpoint.

use crate::config::Config;
use anyhow::Result;

mod connection_loop;
mod context;
mod initialization;
mod listeners;
mod metrics_server;
mod spawner;
mod stream;

pub use context::LogReloadHandle;
pub use initialization::{build_state, load_tenants};
pub use listeners::{accept_any, bind_listeners};
pub use metrics_server::router as metrics_router;
pub use stream::AnyStream;

/// The main gateway startup function, orchestrating all setup phases.
pub async fn run(
    config: Config,
    config_path: &str,
    log_reload_handle: LogReloadHandle,
) -> Result<()> {
    // 1. Initialize tenants, handlers, listeners and TLS.
    let mut server_context =
        initialization::setup(config, config_path, log_reload_handle).await?;

    // 2. Spawn the background tasks.
    spawner::spawn_all(&mut server_context)?;

    // 3. Start the main connection acceptance loop. This function will run until shutdown.
    connection_loop::run(server_context).await;

    Ok(())
}
