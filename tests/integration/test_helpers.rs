// tests/integration/test_helpers.rs

//! Test helpers for end-to-end tests: an in-memory backend, a gateway bound
//! to ephemeral ports and a line-oriented SC client.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sip2gate::config::Config;
use sip2gate::connection::ConnectionHandler;
use sip2gate::core::GatewayError;
use sip2gate::core::handler::{BackendCall, IlsBackend};
use sip2gate::core::protocol::{Command, Response};
use sip2gate::core::state::GatewayState;
use sip2gate::core::tenant::TenantsDocument;
use sip2gate::server::{accept_any, bind_listeners, build_state};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// How long a test waits for a single response line.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A backend that answers from canned JSON bodies and records every call.
#[derive(Debug, Default)]
pub struct FakeBackend {
    responses: Mutex<HashMap<Command, Value>>,
    failing: Mutex<HashSet<Command>>,
    calls: Mutex<Vec<Value>>,
}

impl FakeBackend {
    /// A backend that accepts every login.
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.respond(Command::Login, json!({ "ok": true }));
        Arc::new(backend)
    }

    /// Sets the JSON body returned for `command`.
    pub fn respond(&self, command: Command, body: Value) {
        self.responses.lock().insert(command, body);
    }

    /// Makes every call for `command` fail.
    pub fn fail(&self, command: Command) {
        self.failing.lock().insert(command);
    }

    /// Every call received so far, serialized as the HTTP backend would send it.
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }

    /// The calls whose request carried `command`.
    pub fn calls_for(&self, command: Command) -> Vec<Value> {
        let slug = command.slug();
        self.calls
            .lock()
            .iter()
            .filter(|c| c["command"] == slug)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl IlsBackend for FakeBackend {
    async fn call(&self, call: BackendCall<'_>) -> Result<Response, GatewayError> {
        let command = call.request.command();
        let mut recorded = serde_json::to_value(&call)?;
        recorded["command"] = json!(command.slug());
        self.calls.lock().push(recorded);

        if self.failing.lock().contains(&command) {
            return Err(GatewayError::Backend("backend unavailable".to_string()));
        }
        let body = self
            .responses
            .lock()
            .get(&command)
            .cloned()
            .unwrap_or_else(|| json!({}));
        Response::from_json(command, body)
    }
}

/// A gateway accepting connections on ephemeral local ports.
pub struct TestContext {
    pub state: Arc<GatewayState>,
    pub backend: Arc<FakeBackend>,
    /// The first of `ports`.
    pub port: u16,
    pub ports: Vec<u16>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TestContext {
    /// Starts a gateway with the default configuration and no tenants.
    pub async fn new() -> Self {
        Self::with_config(Config::default(), |_| None).await
    }

    /// Starts a gateway with `config`. `tenants` receives the bound port so
    /// that port-based entries can point at it.
    pub async fn with_config(
        config: Config,
        tenants: impl FnOnce(u16) -> Option<TenantsDocument>,
    ) -> Self {
        Self::with_listeners(config, 1, |ports| tenants(ports[0])).await
    }

    /// Starts a gateway listening on `count` ephemeral ports, all served by
    /// one accept loop. `tenants` receives the bound ports in order.
    pub async fn with_listeners(
        config: Config,
        count: usize,
        tenants: impl FnOnce(&[u16]) -> Option<TenantsDocument>,
    ) -> Self {
        init_tracing();

        let listeners = bind_listeners("127.0.0.1", &vec![0; count])
            .await
            .expect("Failed to bind test listeners");
        let ports: Vec<u16> = listeners
            .iter()
            .map(|l| l.local_addr().unwrap().port())
            .collect();

        let backend = FakeBackend::new();
        let state = build_state(config, backend.clone()).expect("Failed to build gateway state");
        state.tenants.replace(tenants(&ports));

        let (shutdown_tx, _) = broadcast::channel(1);
        let accept_state = state.clone();
        let accept_shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            while let Ok((socket, addr)) = accept_any(&listeners).await {
                let local_port = socket.local_addr().map(|a| a.port()).unwrap_or(0);
                let mut handler = ConnectionHandler::new(
                    socket,
                    addr,
                    local_port,
                    accept_state.clone(),
                    accept_shutdown.subscribe(),
                );
                tokio::spawn(async move {
                    let _ = handler.run().await;
                });
            }
        });

        Self {
            state,
            backend,
            port: ports[0],
            ports,
            shutdown_tx,
        }
    }

    /// Opens a new SC connection.
    pub async fn connect(&self) -> Client {
        Client::connect(self.port).await
    }

    /// Opens a new SC connection to one of the bound `ports`.
    pub async fn connect_to(&self, port: u16) -> Client {
        Client::connect(port).await
    }

    /// Tells every open connection to close.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// A self-check terminal speaking `\r`-terminated lines.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .expect("Failed to connect to test gateway");
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    /// Sends one message, appending the `\r` terminator.
    pub async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\r").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Reads one response line without its terminator.
    pub async fn recv(&mut self) -> String {
        let mut buf = Vec::new();
        let n = tokio::time::timeout(READ_TIMEOUT, self.reader.read_until(b'\r', &mut buf))
            .await
            .expect("Timed out waiting for a response")
            .unwrap();
        assert!(n > 0, "Connection closed before a response arrived");
        assert_eq!(buf.pop(), Some(b'\r'), "Response was not terminated");
        String::from_utf8(buf).expect("Response is not ASCII")
    }

    /// Sends one message and waits for its response.
    pub async fn exchange(&mut self, line: &str) -> String {
        self.send(line).await;
        self.recv().await
    }

    /// True if the gateway closes the connection within `limit`.
    pub async fn closed_within(&mut self, limit: Duration) -> bool {
        let mut buf = Vec::new();
        matches!(
            tokio::time::timeout(limit, self.reader.read_until(b'\r', &mut buf)).await,
            Ok(Ok(0))
        )
    }
}

/// Sets up minimal tracing for tests (ignores the error if already initialized).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
}
