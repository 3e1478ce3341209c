// src/server/initialization.rs

//! Handles the gateway initialization process, from the tenant document to
//! the handler table, TLS and the listening sockets.

use super::context::{LogReloadHandle, ServerContext};
use super::listeners::bind_listeners;
use crate::config::Config;
use crate::core::handler::{HandlerRegistry, HttpIlsBackend, IlsBackend};
use crate::core::state::GatewayState;
use crate::core::tenant::{TenantResolutionEngine, TenantStore, TenantsDocument};
use anyhow::{Result, anyhow};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tokio_rustls::{TlsAcceptor, rustls};
use tracing::{info, warn};

/// Initializes all gateway components before starting the main loop.
pub async fn setup(
    config: Config,
    config_path: &str,
    log_reload_handle: LogReloadHandle,
) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let acceptor = setup_tls(&config)?;

    let backend = HttpIlsBackend::new(
        &config.backend.base_url,
        Duration::from_millis(config.backend.timeout_ms),
    )?;
    let state = build_state(config, Arc::new(backend))?;
    info!("Gateway state initialized.");

    let listeners = bind_listeners(&state.config.host, &state.config.listen_ports()).await?;
    let connection_permits = Arc::new(Semaphore::new(state.config.max_clients));

    Ok(ServerContext {
        state,
        listeners,
        shutdown_tx,
        background_tasks: JoinSet::new(),
        acceptor,
        connection_permits,
        config_path: config_path.to_string(),
        log_reload_handle,
    })
}

/// Builds the shared gateway state: the tenant store with its document, the
/// resolver chain and the handler table bound to `backend`.
pub fn build_state(config: Config, backend: Arc<dyn IlsBackend>) -> Result<Arc<GatewayState>> {
    let document = load_tenants(&config)?;
    let tenants = TenantStore::new(config.default_tenant.clone(), document);

    let resolution = &config.tenant_resolution;
    let engine =
        TenantResolutionEngine::from_names(&resolution.resolvers, &resolution.username_prefix_delimiter);
    if engine.resolver_names().is_empty() {
        info!("No tenant resolvers enabled; all connections use the default tenant.");
    } else {
        info!("Tenant resolvers: {:?}", engine.resolver_names());
    }

    let handlers = HandlerRegistry::new(backend);
    Ok(Arc::new(GatewayState::new(
        Arc::new(config),
        Arc::new(tenants),
        Arc::new(engine),
        Arc::new(handlers),
    )))
}

/// Loads the multi-tenant document named by the configuration, if any.
pub fn load_tenants(config: &Config) -> Result<Option<TenantsDocument>> {
    match &config.tenant_resolution.tenants_file {
        Some(path) => Ok(TenantsDocument::load(path)?),
        None => Ok(None),
    }
}

/// Sets up the TLS acceptor if TLS is enabled in the configuration.
fn setup_tls(config: &Config) -> Result<Option<TlsAcceptor>> {
    if config.tls.enabled {
        info!("TLS is enabled. Loading certificate and key.");
        let certs = load_certs(&config.tls.cert_path)?;
        let key = load_key(&config.tls.key_path)?;
        let server_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        Ok(Some(TlsAcceptor::from(Arc::new(server_config))))
    } else {
        Ok(None)
    }
}

/// Loads TLS certificates from a PEM file.
fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let cert_file = File::open(path)
        .map_err(|e| anyhow!("Failed to open certificate file '{}': {}", path, e))?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs = rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(anyhow!("No certificates found in '{}'", path));
    }
    Ok(certs)
}

/// Loads a private key from a PEM file.
fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let key_file = File::open(path)
        .map_err(|e| anyhow!("Failed to open private key file '{}': {}", path, e))?;
    let mut key_reader = BufReader::new(key_file);
    rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow!("No private key found in key file '{}'", path))
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    let protocol = &config.protocol;
    info!(
        "Protocol: message delimiter {:?}, field delimiter {:?}, charset {}, error detection {}.",
        protocol.message_delimiter,
        protocol.field_delimiter,
        protocol.charset.name(),
        if protocol.error_detection_enabled { "on" } else { "off" }
    );
    info!(
        "Forwarding to backend at {} (timeout {} ms).",
        config.backend.base_url, config.backend.timeout_ms
    );
    if config.idle_timeout_secs == 0 {
        warn!("No idle timeout configured; idle SC connections are kept open indefinitely.");
    }
}
