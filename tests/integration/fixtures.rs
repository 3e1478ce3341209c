// tests/integration/fixtures.rs

//! Canned SC messages and tenant documents shared by the integration tests.

#![allow(dead_code)]

use sip2gate::core::tenant::{TenantConfig, TenantsDocument};

/// A transaction date in the SIP2 18-character layout.
pub const TRANSACTION_DATE: &str = "20240115    103000";
/// An absent date.
pub const NO_DATE: &str = "                  ";

pub fn login(user: &str, password: &str) -> String {
    format!("9300CN{user}|CO{password}|")
}

pub fn login_at(user: &str, password: &str, location: &str) -> String {
    format!("9300CN{user}|CO{password}|CP{location}|")
}

pub fn sc_status() -> String {
    "9900802.00".to_string()
}

pub fn checkout(patron: &str, item: &str) -> String {
    format!("11YN{TRANSACTION_DATE}{NO_DATE}AOinst|AA{patron}|AB{item}|AC|")
}

pub fn checkin(item: &str) -> String {
    format!("09N{TRANSACTION_DATE}{NO_DATE}APdesk|AOinst|AB{item}|AC|")
}

pub fn patron_status(patron: &str) -> String {
    format!("23001{TRANSACTION_DATE}AOinst|AA{patron}|AC|AD|")
}

pub fn end_patron_session(patron: &str) -> String {
    format!("35{TRANSACTION_DATE}AOinst|AA{patron}|")
}

/// A document whose entries each carry an institution id of their own.
pub fn tenants(entries: Vec<TenantConfig>) -> Option<TenantsDocument> {
    Some(TenantsDocument { tenants: entries })
}

pub fn tenant(id: &str, institution_id: &str) -> TenantConfig {
    TenantConfig {
        institution_id: Some(institution_id.to_string()),
        ..TenantConfig::named(id)
    }
}
