// src/server/listeners.rs

//! Binds every listening port and accepts from all of them at once.

use anyhow::{Context, Result, anyhow};
use futures::future::select_all;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

/// Binds one listener per port on `host`, in the order given.
pub async fn bind_listeners(host: &str, ports: &[u16]) -> Result<Vec<TcpListener>> {
    if ports.is_empty() {
        return Err(anyhow!("no listening port configured"));
    }
    let mut listeners = Vec::with_capacity(ports.len());
    for &port in ports {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {host}:{port}"))?;
        info!("sip2gate listening on {}:{}", host, port);
        listeners.push(listener);
    }
    Ok(listeners)
}

/// Waits for the next connection on any of `listeners`.
///
/// `TcpListener::accept` is cancel-safe, so the futures of the listeners that
/// did not win are dropped without losing a connection. `listeners` must not
/// be empty.
pub async fn accept_any(listeners: &[TcpListener]) -> io::Result<(TcpStream, SocketAddr)> {
    if listeners.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "no listeners"));
    }
    let (accepted, _, _) = select_all(listeners.iter().map(|l| Box::pin(l.accept()))).await;
    accepted
}
