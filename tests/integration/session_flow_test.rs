// tests/integration/session_flow_test.rs

//! End-to-end message flows over a real TCP connection.

use super::fixtures::*;
use super::test_helpers::TestContext;
use serde_json::json;
use sip2gate::config::Config;
use sip2gate::core::protocol::Command;
use sip2gate::core::protocol::types::CirculationStatus;
use std::time::Duration;

#[tokio::test]
async fn test_login_is_forwarded_and_acknowledged() {
    let ctx = TestContext::new().await;
    let mut client = ctx.connect().await;

    assert_eq!(client.exchange(&login_at("user_id", "passw0rd", "circ_desk")).await, "941|");

    let calls = ctx.backend.calls_for(Command::Login);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["request"]["login_user_id"], "user_id");
    assert_eq!(calls[0]["request"]["login_password"], "passw0rd");
    assert_eq!(calls[0]["request"]["location_code"], "circ_desk");
    assert!(calls[0]["tenant"].is_null());
}

#[tokio::test]
async fn test_rejected_login_is_relayed() {
    let ctx = TestContext::new().await;
    ctx.backend.respond(Command::Login, json!({ "ok": false }));
    let mut client = ctx.connect().await;
    assert_eq!(client.exchange(&login("user_id", "wrong")).await, "940|");
}

#[tokio::test]
async fn test_sc_status_is_answered_locally() {
    let mut config = Config::default();
    config.default_tenant.institution_id = Some("main".to_string());
    config.default_tenant.library_name = Some("Main Library".to_string());
    let ctx = TestContext::with_config(config, |_| None).await;
    let mut client = ctx.connect().await;

    let response = client.exchange(&sc_status()).await;
    assert!(response.starts_with("98YYYYNN010003"), "{response}");
    assert!(
        response.ends_with("2.00AOmain|AMMain Library|BXYYYYYYYYYYYYYYYY|"),
        "{response}"
    );
    assert!(ctx.backend.calls().is_empty());
}

#[tokio::test]
async fn test_resend_before_any_exchange_asks_sc_to_resend() {
    let ctx = TestContext::new().await;
    let mut client = ctx.connect().await;
    assert_eq!(client.exchange("97").await, "96");
    // The connection stays usable.
    assert_eq!(client.exchange(&login("user_id", "pw")).await, "941|");
}

#[tokio::test]
async fn test_resend_replays_previous_response_without_backend_call() {
    let ctx = TestContext::new().await;
    let mut client = ctx.connect().await;

    assert_eq!(client.exchange(&login("user_id", "pw")).await, "941|");
    assert_eq!(client.exchange("97").await, "941|");
    assert_eq!(client.exchange("97").await, "941|");
    assert_eq!(ctx.backend.calls_for(Command::Login).len(), 1);
}

#[tokio::test]
async fn test_invalid_messages_ask_sc_to_resend() {
    let ctx = TestContext::new().await;
    let mut client = ctx.connect().await;

    assert_eq!(client.exchange("XY00garbage|").await, "96");
    assert_eq!(client.exchange("9").await, "96");
    assert_eq!(client.exchange("941|").await, "96");
    assert_eq!(client.exchange("9300CNuser_id").await, "96");
    assert!(ctx.backend.calls().is_empty());

    // An invalid message does not replace the previous exchange.
    assert_eq!(client.exchange(&login("user_id", "pw")).await, "941|");
    assert_eq!(client.exchange("XY").await, "96");
    assert_eq!(client.exchange("97").await, "941|");
}

#[tokio::test]
async fn test_error_detection_round_trip() {
    let mut config = Config::default();
    config.protocol.error_detection_enabled = true;
    config.default_tenant.error_detection_enabled = Some(true);
    let ctx = TestContext::with_config(config, |_| None).await;
    let mut client = ctx.connect().await;

    // Corrupted checksum.
    assert_eq!(
        client.exchange("9300CNuser_id|COpassw0rd|AY1AZF595").await,
        "96AZFEF6"
    );
    // Missing suffix.
    assert_eq!(client.exchange("9300CNuser_id|COpassw0rd|").await, "96AZFEF6");

    assert_eq!(
        client.exchange("9300CNuser_id|COpassw0rd|AY1AZF594").await,
        "941|AY1AZFD80"
    );
    assert_eq!(client.exchange("97AZFEF5").await, "941|AY1AZFD80");
    assert_eq!(ctx.backend.calls_for(Command::Login).len(), 1);
}

#[tokio::test]
async fn test_handler_failure_sends_negative_response() {
    let ctx = TestContext::new().await;
    ctx.backend.fail(Command::Checkout);
    let mut client = ctx.connect().await;

    let response = client.exchange(&checkout("patron", "item")).await;
    assert!(response.starts_with("120NUU"), "{response}");
    assert!(
        response.ends_with("AOinst|AApatron|ABitem|AJ|AH|AFRequest failed, please try again.|"),
        "{response}"
    );
    // Negative responses are not kept for resend.
    assert_eq!(client.exchange("97").await, "96");
}

#[tokio::test]
async fn test_checkout_is_forwarded_with_session() {
    let ctx = TestContext::new().await;
    ctx.backend.respond(
        Command::Checkout,
        json!({
            "ok": true,
            "renewal_ok": false,
            "desensitize": true,
            "transaction_date": "2024-01-15T10:30:00Z",
            "institution_id": "inst",
            "patron_identifier": "patron",
            "item_identifier": "item",
            "title_identifier": "A Book",
            "due_date": "2024-02-15T23:59:00Z"
        }),
    );
    let mut client = ctx.connect().await;

    assert_eq!(client.exchange(&login("kiosk", "pw")).await, "941|");
    let response = client.exchange(&checkout("patron", "item")).await;
    assert_eq!(
        response,
        "121NUY20240115    103000AOinst|AApatron|ABitem|AJA Book|AH20240215    235900|"
    );

    let calls = ctx.backend.calls_for(Command::Checkout);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["session"]["login_user_id"], "kiosk");
    assert_eq!(calls[0]["session"]["patron_identifier"], "patron");
    assert_eq!(calls[0]["request"]["item_identifier"], "item");
    assert!(calls[0]["session"].get("password").is_none());
}

#[tokio::test]
async fn test_checkin_rejected_by_circulation_status() {
    let mut config = Config::default();
    config.default_tenant.checkin_rejected_statuses = Some(vec![CirculationStatus::Lost]);
    let ctx = TestContext::with_config(config, |_| None).await;
    ctx.backend.respond(
        Command::ItemInformation,
        json!({ "circulation_status": "lost", "title_identifier": "Lost Book" }),
    );
    let mut client = ctx.connect().await;

    let response = client.exchange(&checkin("item")).await;
    assert!(response.starts_with("100NUY"), "{response}");
    assert!(response.contains("AJLost Book|"), "{response}");
    assert!(ctx.backend.calls_for(Command::Checkin).is_empty());
    assert_eq!(ctx.backend.calls_for(Command::ItemInformation).len(), 1);
}

#[tokio::test]
async fn test_checkin_allowed_status_is_forwarded() {
    let mut config = Config::default();
    config.default_tenant.checkin_rejected_statuses = Some(vec![CirculationStatus::Lost]);
    let ctx = TestContext::with_config(config, |_| None).await;
    ctx.backend.respond(
        Command::ItemInformation,
        json!({ "circulation_status": "charged" }),
    );
    ctx.backend.respond(
        Command::Checkin,
        json!({ "ok": true, "resensitize": true, "alert": false, "item_identifier": "item" }),
    );
    let mut client = ctx.connect().await;

    let response = client.exchange(&checkin("item")).await;
    assert!(response.starts_with("101YUN"), "{response}");
    assert_eq!(ctx.backend.calls_for(Command::Checkin).len(), 1);
}

#[tokio::test]
async fn test_end_patron_session_is_local() {
    let ctx = TestContext::new().await;
    ctx.backend.respond(
        Command::PatronStatusRequest,
        json!({ "patron_identifier": "patron", "valid_patron": true }),
    );
    let mut client = ctx.connect().await;

    let status = client.exchange(&patron_status("patron")).await;
    assert!(status.starts_with("24"), "{status}");

    let response = client.exchange(&end_patron_session("patron")).await;
    assert!(response.starts_with("36Y"), "{response}");
    assert!(response.ends_with("AOinst|AApatron|"), "{response}");
    assert!(ctx.backend.calls_for(Command::EndPatronSession).is_empty());
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let mut config = Config::default();
    config.idle_timeout_secs = 1;
    let ctx = TestContext::with_config(config, |_| None).await;
    let mut client = ctx.connect().await;
    assert!(client.closed_within(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let ctx = TestContext::new().await;
    let mut client = ctx.connect().await;
    assert_eq!(client.exchange(&login("user_id", "pw")).await, "941|");
    ctx.shutdown();
    assert!(client.closed_within(Duration::from_secs(5)).await);
}
