// src/server/connection_loop.rs

//! Contains the main loop for accepting connections and handling graceful
//! shutdown and SIGHUP reloads.

use super::context::ServerContext;
use super::initialization::load_tenants;
use super::listeners::accept_any;
use super::stream::AnyStream;
use crate::config::Config;
use crate::connection::ConnectionHandler;
use crate::core::metrics;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::filter::EnvFilter;

/// The main loop that accepts connections and handles graceful shutdown.
pub async fn run(mut ctx: ServerContext) {
    let mut client_tasks = JoinSet::new();

    let (mut sigint, mut sigterm, mut sighup) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(int), Ok(term), Ok(hup)) => (int, term, hup),
        (int, term, hup) => {
            let e = int.err().or(term.err()).or(hup.err());
            error!("CRITICAL: Failed to register signal handlers: {e:?}. Shutting down.");
            return;
        }
    };

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }
            _ = sighup.recv() => {
                info!("SIGHUP received, reloading log level and tenants.");
                if let Err(e) = reload(&ctx) {
                    error!("Reload failed, keeping the current settings: {:#}", e);
                }
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = accept_any(&ctx.listeners) => {
                let (socket, addr) = match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        metrics::SOCKET_ERRORS_TOTAL.inc();
                        continue;
                    }
                };
                metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

                let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                    warn!(
                        "Rejecting connection from {}: max_clients ({}) reached.",
                        addr, ctx.state.config.max_clients
                    );
                    continue;
                };

                let local_port = match socket.local_addr() {
                    Ok(local) => local.port(),
                    Err(e) => {
                        warn!("Could not read local address for {}: {}", addr, e);
                        metrics::SOCKET_ERRORS_TOTAL.inc();
                        continue;
                    }
                };
                info!("Accepted new connection from {} on port {}", addr, local_port);

                let state = ctx.state.clone();
                let shutdown_rx = ctx.shutdown_tx.subscribe();
                let acceptor = ctx.acceptor.clone();
                let span = info_span!("conn", peer = %addr);

                client_tasks.spawn(async move {
                    let _permit = permit;
                    let stream = match acceptor {
                        Some(acceptor) => match acceptor.accept(socket).await {
                            Ok(tls_stream) => {
                                info!("TLS handshake successful for {addr}");
                                AnyStream::Tls(Box::new(tls_stream))
                            }
                            Err(e) => {
                                warn!("TLS handshake error for {addr}: {e}");
                                metrics::SOCKET_ERRORS_TOTAL.inc();
                                return;
                            }
                        },
                        None => AnyStream::Tcp(socket),
                    };
                    debug!("Serving {} over {}.", addr, stream.transport());
                    let mut handler = ConnectionHandler::new(stream, addr, local_port, state, shutdown_rx);
                    if let Err(e) = handler.run().await {
                        warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                    }
                }.instrument(span));
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        warn!("No task was listening for the shutdown signal.");
    }

    if tokio::time::timeout(Duration::from_secs(5), async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for client connections; aborting the rest.");
        client_tasks.shutdown().await;
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Gateway shutdown complete.");
}

/// Re-reads the configuration file, applies its log level and swaps in its
/// tenant document. Everything else needs a restart.
fn reload(ctx: &ServerContext) -> Result<()> {
    let config = Config::from_file(&ctx.config_path)?;

    ctx.log_reload_handle
        .reload(EnvFilter::new(&config.log_level))
        .context("Failed to apply log level")?;
    info!("Log level set to '{}'.", config.log_level);

    if config.tenant_resolution.tenants_file != ctx.state.config.tenant_resolution.tenants_file {
        warn!("tenants_file changed; the new path is used, other settings need a restart.");
    }
    ctx.state.tenants.replace(load_tenants(&config)?);
    Ok(())
}
