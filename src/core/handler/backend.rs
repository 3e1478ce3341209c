// src/core/handler/backend.rs

//! The seam to the integrated library system.
//!
//! Handlers never talk HTTP themselves; they hand a [`BackendCall`] to an
//! [`IlsBackend`]. The production implementation posts JSON with `reqwest`.

use crate::connection::SessionInfo;
use crate::core::GatewayError;
use crate::core::protocol::{Request, Response};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// One request forwarded to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendCall<'a> {
    pub tenant: Option<&'a str>,
    pub session: SessionInfo,
    pub request: &'a Request,
}

/// Answers requests on behalf of the gateway.
#[async_trait]
pub trait IlsBackend: Send + Sync + fmt::Debug {
    async fn call(&self, call: BackendCall<'_>) -> Result<Response, GatewayError>;
}

/// Posts `{"tenant", "session", "request"}` to `<base_url>/<command>` and
/// decodes the JSON body as the typed response.
#[derive(Debug, Clone)]
pub struct HttpIlsBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpIlsBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl IlsBackend for HttpIlsBackend {
    async fn call(&self, call: BackendCall<'_>) -> Result<Response, GatewayError> {
        let command = call.request.command();
        let url = self.base_url.join(command.slug())?;
        debug!("Forwarding '{}' to {}", command, url);

        let response = self.client.post(url).json(&call).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Backend answered '{}' with HTTP {}", command, status);
            return Err(GatewayError::Backend(format!(
                "backend returned HTTP {status} for '{command}'"
            )));
        }
        let body: serde_json::Value = response.json().await?;
        Response::from_json(command, body)
    }
}
