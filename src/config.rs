// src/config.rs

//! Manages gateway configuration: loading, resolving layered tenant defaults,
//! and validation.

use crate::core::protocol::Charset;
use crate::core::tenant::TenantConfig;
use crate::core::tenant::resolver::{DEFAULT_USERNAME_PREFIX_DELIMITER, resolver_by_name};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;
use url::Url;

/// Framing and integrity settings applied to connections that no tenant
/// entry overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    /// Terminates every message on the wire.
    #[serde(default = "default_message_delimiter")]
    pub message_delimiter: char,
    /// Terminates every variable-length field.
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: char,
    #[serde(default)]
    pub charset: Charset,
    /// If true, requests must carry the `AY`/`AZ` suffix and responses get one.
    #[serde(default)]
    pub error_detection_enabled: bool,
}

fn default_message_delimiter() -> char {
    '\r'
}
fn default_field_delimiter() -> char {
    '|'
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            message_delimiter: default_message_delimiter(),
            field_delimiter: default_field_delimiter(),
            charset: Charset::default(),
            error_detection_enabled: false,
        }
    }
}

impl ProtocolConfig {
    /// The protocol settings as the lowest tenant layer.
    fn as_tenant_layer(&self) -> TenantConfig {
        TenantConfig {
            message_delimiter: Some(self.message_delimiter),
            field_delimiter: Some(self.field_delimiter),
            charset: Some(self.charset),
            error_detection_enabled: Some(self.error_detection_enabled),
            ..Default::default()
        }
    }
}

/// Which resolvers run, in which order, and where the tenants live.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TenantResolutionConfig {
    /// Resolver names in priority order: `port`, `subnet`, `location_code`,
    /// `username_prefix`.
    #[serde(default)]
    pub resolvers: Vec<String>,
    #[serde(default = "default_username_prefix_delimiter")]
    pub username_prefix_delimiter: String,
    /// Path of the JSON multi-tenant document. Unset means single-tenant mode.
    #[serde(default)]
    pub tenants_file: Option<String>,
}

fn default_username_prefix_delimiter() -> String {
    DEFAULT_USERNAME_PREFIX_DELIMITER.to_string()
}

impl Default for TenantResolutionConfig {
    fn default() -> Self {
        Self {
            resolvers: Vec::new(),
            username_prefix_delimiter: default_username_prefix_delimiter(),
            tenants_file: None,
        }
    }
}

/// Where requests that are not answered locally are forwarded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8080/sip2/".to_string()
}
fn default_backend_timeout_ms() -> u64 {
    5000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_ms: default_backend_timeout_ms(),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9464
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

/// Configuration for TLS encryption.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cert_path")]
    pub cert_path: String,
    #[serde(default = "default_key_path")]
    pub key_path: String,
}

fn default_cert_path() -> String {
    "sip2gate.crt".to_string()
}
fn default_key_path() -> String {
    "sip2gate.key".to_string()
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_path: default_cert_path(),
            key_path: default_key_path(),
        }
    }
}

/// A raw representation of the config file before validation and resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    extra_ports: Vec<u16>,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default)]
    idle_timeout_secs: u64,
    #[serde(default)]
    protocol: ProtocolConfig,
    #[serde(default)]
    default_tenant: TenantConfig,
    #[serde(default)]
    tenant_resolution: TenantResolutionConfig,
    #[serde(default)]
    backend: BackendConfig,
    #[serde(default)]
    tls: TlsConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    6001
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    1024
}

/// Represents the final, validated, and resolved gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Further ports served by the same accept loop, typically one per
    /// tenant selected by the `port` resolver.
    #[serde(default)]
    pub extra_ports: Vec<u16>,
    pub log_level: String,
    pub max_clients: usize,
    /// Seconds without a complete frame before a connection is closed. `0` disables it.
    pub idle_timeout_secs: u64,
    pub protocol: ProtocolConfig,
    /// The bottom tenant layer, with `[protocol]` already folded in.
    pub default_tenant: TenantConfig,
    pub tenant_resolution: TenantResolutionConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        let protocol = ProtocolConfig::default();
        Self {
            host: default_host(),
            port: default_port(),
            extra_ports: Vec::new(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            idle_timeout_secs: 0,
            default_tenant: protocol.as_tenant_layer(),
            protocol,
            tenant_resolution: TenantResolutionConfig::default(),
            backend: BackendConfig::default(),
            tls: TlsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config file '{path}'"))
    }

    /// Parses, resolves and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML")?;

        let default_tenant = raw_config
            .default_tenant
            .merged_over(&raw_config.protocol.as_tenant_layer());

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            extra_ports: raw_config.extra_ports,
            log_level: raw_config.log_level,
            max_clients: raw_config.max_clients,
            idle_timeout_secs: raw_config.idle_timeout_secs,
            protocol: raw_config.protocol,
            default_tenant,
            tenant_resolution: raw_config.tenant_resolution,
            backend: raw_config.backend,
            tls: raw_config.tls,
            metrics: raw_config.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    /// Every port to listen on: `port` first, then `extra_ports` without duplicates.
    pub fn listen_ports(&self) -> Vec<u16> {
        let mut ports = vec![self.port];
        for &port in &self.extra_ports {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
        ports
    }

    /// Validates the resolved configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.extra_ports.contains(&0) {
            return Err(anyhow!("extra_ports cannot contain 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }

        let protocol = &self.protocol;
        if protocol.message_delimiter == protocol.field_delimiter {
            return Err(anyhow!(
                "protocol.message_delimiter and protocol.field_delimiter must differ"
            ));
        }
        for (name, delimiter) in [
            ("message_delimiter", protocol.message_delimiter),
            ("field_delimiter", protocol.field_delimiter),
        ] {
            if !delimiter.is_ascii() {
                return Err(anyhow!("protocol.{name} must be an ASCII character"));
            }
        }

        if let Some(flags) = &self.default_tenant.supported_messages
            && flags.chars().count() != 16
        {
            return Err(anyhow!(
                "default_tenant.supported_messages must be 16 Y/N characters"
            ));
        }

        let resolution = &self.tenant_resolution;
        if resolution.username_prefix_delimiter.is_empty() {
            return Err(anyhow!(
                "tenant_resolution.username_prefix_delimiter cannot be empty"
            ));
        }
        for name in &resolution.resolvers {
            if resolver_by_name(name, &resolution.username_prefix_delimiter).is_none() {
                warn!("Unknown tenant resolver '{}' is ignored.", name);
            }
        }
        if !resolution.resolvers.is_empty() && resolution.tenants_file.is_none() {
            warn!(
                "Tenant resolvers are configured but no tenants_file is set; every connection uses the default tenant."
            );
        }

        let base_url = Url::parse(&self.backend.base_url)
            .with_context(|| format!("invalid backend.base_url '{}'", self.backend.base_url))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("backend.base_url must use http or https"));
        }
        if self.backend.timeout_ms == 0 {
            return Err(anyhow!("backend.timeout_ms cannot be 0"));
        }

        if self.tls.enabled && (self.tls.cert_path.is_empty() || self.tls.key_path.is_empty()) {
            return Err(anyhow!(
                "tls.cert_path and tls.key_path are required when TLS is enabled"
            ));
        }
        if self.metrics.enabled && self.listen_ports().contains(&self.metrics.port) {
            return Err(anyhow!("metrics.port cannot equal a listening port"));
        }

        Ok(())
    }
}
