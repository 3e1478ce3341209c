// tests/integration/tenant_routing_test.rs

//! Tenant selection at connect and login time, observed through the
//! institution id reported in the ACS status.

use super::fixtures::*;
use super::test_helpers::TestContext;
use sip2gate::config::Config;
use sip2gate::core::protocol::Command;
use sip2gate::core::tenant::TenantConfig;

fn config_with_resolvers(resolvers: &[&str]) -> Config {
    let mut config = Config::default();
    config.default_tenant.institution_id = Some("DEFAULT".to_string());
    config.tenant_resolution.resolvers = resolvers.iter().map(|r| r.to_string()).collect();
    config
}

fn institution_of(acs_status: &str) -> &str {
    let start = acs_status.find("AO").expect("ACS status has an institution id") + 2;
    let end = start + acs_status[start..].find('|').expect("institution id is terminated");
    &acs_status[start..end]
}

#[tokio::test]
async fn test_port_resolver_selects_tenant_at_connect() {
    let ctx = TestContext::with_config(config_with_resolvers(&["port"]), |port| {
        tenants(vec![
            TenantConfig {
                port: Some("1".to_string()),
                ..tenant("other", "OTHER")
            },
            TenantConfig {
                port: Some(port.to_string()),
                ..tenant("branch", "BRANCH")
            },
        ])
    })
    .await;
    let mut client = ctx.connect().await;

    assert_eq!(institution_of(&client.exchange(&sc_status()).await), "BRANCH");
    assert_eq!(client.exchange(&login("kiosk", "pw")).await, "941|");
    assert_eq!(ctx.backend.calls_for(Command::Login)[0]["tenant"], "branch");
}

#[tokio::test]
async fn test_each_listening_port_selects_its_tenant() {
    let ctx = TestContext::with_listeners(config_with_resolvers(&["port"]), 2, |ports| {
        tenants(vec![
            TenantConfig {
                port: Some(ports[0].to_string()),
                ..tenant("north", "NORTH")
            },
            TenantConfig {
                port: Some(ports[1].to_string()),
                ..tenant("south", "SOUTH")
            },
        ])
    })
    .await;
    let (north_port, south_port) = (ctx.ports[0], ctx.ports[1]);
    assert_ne!(north_port, south_port);

    let mut north = ctx.connect_to(north_port).await;
    let mut south = ctx.connect_to(south_port).await;
    assert_eq!(institution_of(&south.exchange(&sc_status()).await), "SOUTH");
    assert_eq!(institution_of(&north.exchange(&sc_status()).await), "NORTH");

    assert_eq!(north.exchange(&login("kiosk", "pw")).await, "941|");
    assert_eq!(south.exchange(&login("kiosk", "pw")).await, "941|");
    let tenants: Vec<_> = ctx
        .backend
        .calls_for(Command::Login)
        .iter()
        .map(|c| c["tenant"].clone())
        .collect();
    assert_eq!(tenants, vec!["north", "south"]);
}

#[tokio::test]
async fn test_no_match_uses_default_tenant() {
    let ctx = TestContext::with_config(config_with_resolvers(&["port"]), |_| {
        tenants(vec![TenantConfig {
            port: Some("1".to_string()),
            ..tenant("other", "OTHER")
        }])
    })
    .await;
    let mut client = ctx.connect().await;
    assert_eq!(institution_of(&client.exchange(&sc_status()).await), "DEFAULT");
}

#[tokio::test]
async fn test_connect_tenant_framing_is_used() {
    let ctx = TestContext::with_config(config_with_resolvers(&["port"]), |port| {
        tenants(vec![TenantConfig {
            port: Some(port.to_string()),
            field_delimiter: Some('^'),
            ..tenant("caret", "CARET")
        }])
    })
    .await;
    let mut client = ctx.connect().await;
    assert_eq!(client.exchange("9300CNkiosk^COpw^").await, "941^");
}

#[tokio::test]
async fn test_username_prefix_selects_tenant_and_is_stripped() {
    let ctx = TestContext::with_config(config_with_resolvers(&["username_prefix"]), |_| {
        tenants(vec![tenant("acme", "ACME")])
    })
    .await;
    let mut client = ctx.connect().await;

    assert_eq!(client.exchange(&login("acme__kiosk", "pw")).await, "941|");
    let calls = ctx.backend.calls_for(Command::Login);
    assert_eq!(calls[0]["tenant"], "acme");
    assert_eq!(calls[0]["request"]["login_user_id"], "kiosk");

    assert_eq!(institution_of(&client.exchange(&sc_status()).await), "ACME");
}

#[tokio::test]
async fn test_username_without_prefix_keeps_default_tenant() {
    let ctx = TestContext::with_config(config_with_resolvers(&["username_prefix"]), |_| {
        tenants(vec![tenant("acme", "ACME")])
    })
    .await;
    let mut client = ctx.connect().await;

    assert_eq!(client.exchange(&login("kiosk", "pw")).await, "941|");
    let calls = ctx.backend.calls_for(Command::Login);
    assert!(calls[0]["tenant"].is_null());
    assert_eq!(calls[0]["request"]["login_user_id"], "kiosk");
    assert_eq!(institution_of(&client.exchange(&sc_status()).await), "DEFAULT");
}

#[tokio::test]
async fn test_location_code_selects_tenant_at_login() {
    let ctx = TestContext::with_config(config_with_resolvers(&["location_code"]), |_| {
        tenants(vec![TenantConfig {
            location_codes: vec!["north".to_string()],
            ..tenant("north-branch", "NORTH")
        }])
    })
    .await;
    let mut client = ctx.connect().await;

    assert_eq!(institution_of(&client.exchange(&sc_status()).await), "DEFAULT");
    assert_eq!(client.exchange(&login_at("kiosk", "pw", "north")).await, "941|");
    assert_eq!(institution_of(&client.exchange(&sc_status()).await), "NORTH");
    // Location-code resolution leaves the user id alone.
    assert_eq!(
        ctx.backend.calls_for(Command::Login)[0]["request"]["login_user_id"],
        "kiosk"
    );
}

#[tokio::test]
async fn test_replaced_document_applies_to_new_connections() {
    let ctx = TestContext::with_config(config_with_resolvers(&["port"]), |_| None).await;
    let mut before = ctx.connect().await;
    assert_eq!(institution_of(&before.exchange(&sc_status()).await), "DEFAULT");

    ctx.state.tenants.replace(tenants(vec![TenantConfig {
        port: Some(ctx.port.to_string()),
        ..tenant("reloaded", "RELOADED")
    }]));

    let mut after = ctx.connect().await;
    assert_eq!(institution_of(&after.exchange(&sc_status()).await), "RELOADED");
    // Existing connections keep the tenant they were accepted with.
    assert_eq!(institution_of(&before.exchange(&sc_status()).await), "DEFAULT");
}
