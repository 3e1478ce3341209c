// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a
//! self-check terminal connection.

use super::guard::ConnectionGuard;
use super::session::{PreviousExchange, SessionState};
use crate::core::GatewayError;
use crate::core::metrics;
use crate::core::protocol::checksum::append_error_detection;
use crate::core::protocol::messages::Login;
use crate::core::protocol::{Request, Response, Sip2Codec, decode, encode_response};
use crate::core::state::GatewayState;
use crate::core::tenant::ResolutionContext;
use crate::core::tenant::resolver::split_username;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Screen message of the negative response sent when a handler fails.
const HANDLER_FAILURE_MESSAGE: &str = "Request failed, please try again.";

/// The lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    AwaitingMessage,
    Processing,
    Closed,
}

/// What the read side produced.
enum FrameEvent {
    Line(String),
    PeerClosed,
    IdleTimeout,
    Failed(GatewayError),
}

/// Manages the full lifecycle of a connection: tenant selection at accept,
/// then a strictly sequential read, decode, dispatch, encode, write loop.
pub struct ConnectionHandler<S> {
    framed: Framed<S, Sip2Codec>,
    addr: SocketAddr,
    state: Arc<GatewayState>,
    session: SessionState,
    shutdown_rx: broadcast::Receiver<()>,
    idle_timeout: Option<Duration>,
    conn_state: ConnectionState,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Creates a handler for an accepted socket and runs connect-phase
    /// tenant resolution to pick the framing and session defaults.
    pub fn new(
        socket: S,
        addr: SocketAddr,
        local_port: u16,
        state: Arc<GatewayState>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let session_id = state.next_session_id();
        debug!(
            "Session {}: connection state {:?}",
            session_id,
            ConnectionState::Connecting
        );

        let snapshot = state.tenants.snapshot();
        let remote = addr.to_string();
        let ctx = ResolutionContext::connect(local_port, &remote, snapshot.as_deref());
        let resolved = state.engine.resolve(&ctx);
        let settings = state.tenants.settings_for(resolved.as_ref());
        info!(
            "Session {}: {} on port {} assigned to tenant {:?}.",
            session_id, addr, local_port, settings.tenant
        );

        let codec = Sip2Codec::new(settings.message_delimiter, settings.charset);
        let idle_timeout = match state.config.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            framed: Framed::new(socket, codec),
            addr,
            state,
            session: SessionState::new(session_id, settings),
            shutdown_rx,
            idle_timeout,
            conn_state: ConnectionState::Connecting,
        }
    }

    /// The session this handler owns.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The main event loop for the connection. Returns when the peer closes,
    /// the connection idles out, a socket or framing error occurs, or the
    /// gateway shuts down. No single message can end the loop.
    pub async fn run(&mut self) -> Result<(), GatewayError> {
        let _guard = ConnectionGuard::new(self.session.session_id, self.addr);
        self.transition(ConnectionState::Connected);

        let outcome = loop {
            self.transition(ConnectionState::AwaitingMessage);
            let event = tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    info!("Connection handler for {} received shutdown signal.", self.addr);
                    break Ok(());
                }
                event = next_frame(&mut self.framed, self.idle_timeout) => event,
            };

            match event {
                FrameEvent::Line(line) => {
                    self.transition(ConnectionState::Processing);
                    if let Err(e) = self.process_line(&line).await {
                        metrics::SOCKET_ERRORS_TOTAL.inc();
                        break Err(e);
                    }
                }
                FrameEvent::PeerClosed => {
                    debug!("Connection from {} closed by peer.", self.addr);
                    break Ok(());
                }
                FrameEvent::IdleTimeout => {
                    info!("Connection from {} idle for too long, closing.", self.addr);
                    break Ok(());
                }
                FrameEvent::Failed(e) => {
                    metrics::SOCKET_ERRORS_TOTAL.inc();
                    if is_normal_disconnect(&e) {
                        debug!("Connection from {} closed by peer: {}", self.addr, e);
                        break Ok(());
                    }
                    break Err(e);
                }
            }
        };

        self.transition(ConnectionState::Closed);
        outcome
    }

    /// Handles one framed line. Only write failures are returned; every
    /// protocol or handler failure is answered on the wire.
    async fn process_line(&mut self, line: &str) -> Result<(), GatewayError> {
        let line = line.trim_start_matches('\n');
        if line.is_empty() {
            debug!("Session {}: ignoring empty frame.", self.session.session_id);
            return Ok(());
        }

        let ctx = self.session.decode_context();
        let envelope = decode(line, &ctx);
        debug!(
            "Session {}: decoded {} (valid: {}, seq: {:?})",
            self.session.session_id, envelope.command, envelope.valid, envelope.sequence_number
        );

        let request = match envelope.payload {
            Some(request) if envelope.valid => request,
            _ => {
                metrics::INVALID_MESSAGES_TOTAL.inc();
                match &envelope.failure {
                    Some(failure) if failure.is_message_scoped() => debug!(
                        "Session {}: asking SC to resend: {}",
                        self.session.session_id, failure
                    ),
                    Some(failure) => warn!(
                        "Session {}: unexpected decode failure, asking SC to resend: {}",
                        self.session.session_id, failure
                    ),
                    None => {}
                }
                let (rendered, _) = self.render(&Response::RequestScResend, None);
                return self.write_line(rendered).await;
            }
        };

        if let Request::RequestAcsResend = request {
            metrics::RESEND_REQUESTS_TOTAL.inc();
            let rendered = match &self.session.previous_exchange {
                Some(previous) => previous.rendered.clone(),
                None => {
                    debug!(
                        "Session {}: nothing to resend.",
                        self.session.session_id
                    );
                    self.render(&Response::RequestScResend, None).0
                }
            };
            return self.write_line(rendered).await;
        }

        let mut request = request;
        if let Request::Login(login) = &mut request {
            self.resolve_login_tenant(login);
        }

        let command = request.command();
        metrics::MESSAGES_PROCESSED_TOTAL
            .with_label_values(&[command.slug()])
            .inc();
        let fallback = request.clone();

        let timer = metrics::DISPATCH_LATENCY_SECONDS.start_timer();
        let result = self
            .state
            .handlers
            .dispatch(request, &mut self.session)
            .await;
        timer.observe_duration();

        match result {
            Ok(response) => {
                let (rendered, checksum) = self.render(&response, envelope.sequence_number);
                self.write_line(rendered.clone()).await?;
                self.session.record_exchange(PreviousExchange {
                    sequence_number: envelope.sequence_number,
                    checksum,
                    rendered,
                });
            }
            Err(e) => {
                self.session.error_count += 1;
                metrics::HANDLER_ERRORS_TOTAL
                    .with_label_values(&[command.slug()])
                    .inc();
                warn!(
                    "Session {}: '{}' handler failed: {}",
                    self.session.session_id, command, e
                );
                let negative = Response::negative(
                    &fallback,
                    Utc::now().fixed_offset(),
                    HANDLER_FAILURE_MESSAGE,
                )
                .unwrap_or(Response::RequestScResend);
                let (rendered, _) = self.render(&negative, envelope.sequence_number);
                self.write_line(rendered).await?;
            }
        }
        Ok(())
    }

    /// Runs login-phase resolution and, when it selects another tenant,
    /// reloads the tenant-scoped settings. A username prefix that selected
    /// the tenant is removed from the user id.
    fn resolve_login_tenant(&mut self, login: &mut Login) {
        let snapshot = self.state.tenants.snapshot();
        let username = login.login_user_id.clone();
        let ctx = ResolutionContext::login(
            &username,
            login.location_code.as_deref(),
            snapshot.as_deref(),
        );
        let Some(resolved) = self.state.engine.resolve(&ctx) else {
            return;
        };

        let delimiter = &self.state.config.tenant_resolution.username_prefix_delimiter;
        if self.state.engine.resolver_names().contains(&"username_prefix")
            && let Some((prefix, rest)) = split_username(&username, delimiter)
            && resolved.tenant.as_deref() == Some(prefix)
        {
            login.login_user_id = rest.to_string();
        }

        let settings = self.state.tenants.settings_for(Some(&resolved));
        let tenant = settings.tenant.clone();
        if self.session.apply_login_tenant(settings) {
            info!(
                "Session {}: login moved session to tenant {:?}.",
                self.session.session_id, tenant
            );
        }
    }

    /// Encodes a response and appends the error-detection suffix when the
    /// session has it enabled. Returns the line and its checksum.
    fn render(&self, response: &Response, sequence_number: Option<u8>) -> (String, Option<String>) {
        let settings = &self.session.settings;
        let mut line = encode_response(response, settings.field_delimiter, settings.timezone);
        let checksum = settings.error_detection.then(|| {
            let sequence_number = match response {
                Response::RequestScResend => None,
                _ => sequence_number,
            };
            append_error_detection(&mut line, sequence_number, settings.charset)
        });
        (line, checksum)
    }

    async fn write_line(&mut self, line: String) -> Result<(), GatewayError> {
        debug!("Session {}: sending {:?}", self.session.session_id, line);
        self.framed.send(line).await
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.conn_state != next {
            debug!(
                "Session {}: connection state {:?} -> {:?}",
                self.session.session_id, self.conn_state, next
            );
            self.conn_state = next;
        }
    }
}

async fn next_frame<S>(
    framed: &mut Framed<S, Sip2Codec>,
    idle_timeout: Option<Duration>,
) -> FrameEvent
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let next = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, framed.next()).await {
            Ok(next) => next,
            Err(_) => return FrameEvent::IdleTimeout,
        },
        None => framed.next().await,
    };
    match next {
        Some(Ok(line)) => FrameEvent::Line(line),
        Some(Err(e)) => FrameEvent::Failed(e),
        None => FrameEvent::PeerClosed,
    }
}

/// Helper function to check for non-critical disconnection errors.
fn is_normal_disconnect(e: &GatewayError) -> bool {
    matches!(e, GatewayError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
