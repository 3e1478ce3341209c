// tests/integration/metrics_test.rs

//! The Prometheus endpoint reports gateway counters.

use super::fixtures::*;
use super::test_helpers::TestContext;
use sip2gate::server::metrics_router;
use tokio::net::TcpListener;

async fn scrape() -> (reqwest::StatusCode, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, metrics_router()).await.unwrap();
    });
    let response = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_metrics_endpoint_reports_gateway_counters() {
    let ctx = TestContext::new().await;
    let mut client = ctx.connect().await;
    assert_eq!(client.exchange(&login("user_id", "pw")).await, "941|");
    assert_eq!(client.exchange("97").await, "941|");
    assert_eq!(client.exchange("XY").await, "96");

    let (status, body) = scrape().await;
    assert!(status.is_success());
    assert!(body.contains("sip2gate_resend_requests_total"), "{body}");
    assert!(body.contains("sip2gate_invalid_messages_total"), "{body}");
    assert!(
        body.contains("sip2gate_messages_processed_total{command=\"login\"}"),
        "{body}"
    );
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, metrics_router()).await.unwrap();
    });
    let response = reqwest::get(format!("http://{addr}/other")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
