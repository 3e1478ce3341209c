// tests/integration/backend_test.rs

//! The HTTP backend against a local fake ILS.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use sip2gate::connection::SessionState;
use sip2gate::core::GatewayError;
use sip2gate::core::handler::{BackendCall, HttpIlsBackend, IlsBackend};
use sip2gate::core::protocol::messages::{Login, PatronStatusRequest};
use sip2gate::core::protocol::{Request, Response};
use sip2gate::core::tenant::{TenantConfig, TenantSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

type Received = Arc<Mutex<Vec<(String, Value)>>>;

async fn handle(
    State(received): State<Received>,
    Path(command): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    received.lock().push((command.clone(), body));
    match command.as_str() {
        "login" => Ok(Json(json!({ "ok": true }))),
        "patron-status" => Ok(Json(json!({
            "patron_identifier": "p1",
            "personal_name": "Ada Lovelace",
            "valid_patron": true,
            "transaction_date": "2024-01-15T10:30:00Z"
        }))),
        "renew" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(Json(json!({})))
        }
        _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Serves the fake ILS under `/sip2/` and returns its base URL.
async fn start_fake_ils() -> (String, Received) {
    let received: Received = Arc::default();
    let app = Router::new()
        .route("/sip2/{command}", post(handle))
        .with_state(received.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/sip2"), received)
}

fn session(tenant: &str) -> SessionState {
    SessionState::new(
        1,
        TenantSettings::from_config(&TenantConfig::named(tenant)),
    )
}

async fn call(backend: &HttpIlsBackend, request: &Request, session: &SessionState) -> Result<Response, GatewayError> {
    backend
        .call(BackendCall {
            tenant: session.tenant(),
            session: session.info(),
            request,
        })
        .await
}

#[tokio::test]
async fn test_base_url_gets_trailing_slash() {
    let backend = HttpIlsBackend::new("http://127.0.0.1:1/sip2", Duration::from_secs(1)).unwrap();
    assert_eq!(backend.base_url().as_str(), "http://127.0.0.1:1/sip2/");
    assert!(HttpIlsBackend::new("not a url", Duration::from_secs(1)).is_err());
}

#[tokio::test]
async fn test_login_is_posted_to_command_path() {
    let (base_url, received) = start_fake_ils().await;
    let backend = HttpIlsBackend::new(&base_url, Duration::from_secs(5)).unwrap();
    let request = Request::Login(Login {
        uid_algorithm: '0',
        pwd_algorithm: '0',
        login_user_id: "kiosk".to_string(),
        login_password: "pw".to_string(),
        location_code: None,
    });

    let response = call(&backend, &request, &session("acme")).await.unwrap();
    assert!(matches!(response, Response::Login(ref login) if login.ok));

    let received = received.lock();
    assert_eq!(received.len(), 1);
    let (command, body) = &received[0];
    assert_eq!(command, "login");
    assert_eq!(body["tenant"], "acme");
    assert_eq!(body["session"]["session_id"], 1);
    assert_eq!(body["request"]["login_user_id"], "kiosk");
}

#[tokio::test]
async fn test_json_body_becomes_typed_response() {
    let (base_url, _) = start_fake_ils().await;
    let backend = HttpIlsBackend::new(&base_url, Duration::from_secs(5)).unwrap();
    let request = Request::PatronStatus(PatronStatusRequest {
        patron_identifier: "p1".to_string(),
        ..PatronStatusRequest::default()
    });

    let Response::PatronStatus(status) = call(&backend, &request, &session("acme")).await.unwrap()
    else {
        panic!("Expected a patron status response");
    };
    assert_eq!(status.personal_name, "Ada Lovelace");
    assert_eq!(status.valid_patron, Some(true));
}

#[tokio::test]
async fn test_http_error_is_a_backend_error() {
    let (base_url, _) = start_fake_ils().await;
    let backend = HttpIlsBackend::new(&base_url, Duration::from_secs(5)).unwrap();
    let err = call(&backend, &Request::Checkout(Default::default()), &session("acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Backend(ref msg) if msg.contains("500")), "{err}");
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let (base_url, _) = start_fake_ils().await;
    let backend = HttpIlsBackend::new(&base_url, Duration::from_millis(200)).unwrap();
    let err = call(&backend, &Request::Renew(Default::default()), &session("acme"))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::BackendTimeout);
}

#[tokio::test]
async fn test_unreachable_backend_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend =
        HttpIlsBackend::new(&format!("http://{addr}/"), Duration::from_secs(2)).unwrap();
    let err = call(&backend, &Request::Checkout(Default::default()), &session("acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Backend(_) | GatewayError::BackendTimeout), "{err}");
}
