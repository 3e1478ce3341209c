// src/core/tenant/config.rs

//! Tenant configuration entries, the multi-tenant document and the shared
//! snapshot store the connection tasks read from.

use crate::core::GatewayError;
use crate::core::protocol::Charset;
use crate::core::protocol::types::{CirculationStatus, CurrencyType, SupportedMessages};
use chrono_tz::Tz;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One tenant entry. Every setting is optional so that entries can be layered:
/// an unset field inherits from the layer below it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantConfig {
    /// The tenant id.
    pub tenant: Option<String>,
    /// CIDR block of the self-check terminals that belong to this tenant.
    pub sc_subnet: Option<String>,
    /// Local listening port, string-encoded.
    pub port: Option<String>,
    /// Location codes an SC may report at login.
    pub location_codes: Vec<String>,

    // Protocol settings, applied when the connection is accepted.
    pub message_delimiter: Option<char>,
    pub field_delimiter: Option<char>,
    pub charset: Option<Charset>,
    pub error_detection_enabled: Option<bool>,

    // Tenant-scoped settings, reloaded when login selects a different tenant.
    pub timezone: Option<Tz>,
    pub currency: Option<CurrencyType>,
    pub locale: Option<String>,
    pub checkin_rejected_statuses: Option<Vec<CirculationStatus>>,
    pub patron_password_verification_required: Option<bool>,
    pub use_pin_for_patron_verification: Option<bool>,

    // ACS status reported to SC Status.
    pub institution_id: Option<String>,
    pub library_name: Option<String>,
    pub terminal_location: Option<String>,
    /// 16 characters of `Y`/`N` in `BX` order.
    pub supported_messages: Option<String>,
    pub timeout_period: Option<u16>,
    pub retries_allowed: Option<u16>,
    pub checkin_ok: Option<bool>,
    pub checkout_ok: Option<bool>,
    pub renewal_policy: Option<bool>,
    pub status_update_ok: Option<bool>,
    pub offline_ok: Option<bool>,
}

impl TenantConfig {
    /// A config that only names a tenant.
    pub fn named(tenant: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            ..Default::default()
        }
    }

    /// Layers `self` over `base`: every field set in `self` wins.
    pub fn merged_over(&self, base: &TenantConfig) -> TenantConfig {
        fn pick<T: Clone>(top: &Option<T>, base: &Option<T>) -> Option<T> {
            top.clone().or_else(|| base.clone())
        }
        TenantConfig {
            tenant: pick(&self.tenant, &base.tenant),
            sc_subnet: pick(&self.sc_subnet, &base.sc_subnet),
            port: pick(&self.port, &base.port),
            location_codes: if self.location_codes.is_empty() {
                base.location_codes.clone()
            } else {
                self.location_codes.clone()
            },
            message_delimiter: pick(&self.message_delimiter, &base.message_delimiter),
            field_delimiter: pick(&self.field_delimiter, &base.field_delimiter),
            charset: pick(&self.charset, &base.charset),
            error_detection_enabled: pick(
                &self.error_detection_enabled,
                &base.error_detection_enabled,
            ),
            timezone: pick(&self.timezone, &base.timezone),
            currency: pick(&self.currency, &base.currency),
            locale: pick(&self.locale, &base.locale),
            checkin_rejected_statuses: pick(
                &self.checkin_rejected_statuses,
                &base.checkin_rejected_statuses,
            ),
            patron_password_verification_required: pick(
                &self.patron_password_verification_required,
                &base.patron_password_verification_required,
            ),
            use_pin_for_patron_verification: pick(
                &self.use_pin_for_patron_verification,
                &base.use_pin_for_patron_verification,
            ),
            institution_id: pick(&self.institution_id, &base.institution_id),
            library_name: pick(&self.library_name, &base.library_name),
            terminal_location: pick(&self.terminal_location, &base.terminal_location),
            supported_messages: pick(&self.supported_messages, &base.supported_messages),
            timeout_period: pick(&self.timeout_period, &base.timeout_period),
            retries_allowed: pick(&self.retries_allowed, &base.retries_allowed),
            checkin_ok: pick(&self.checkin_ok, &base.checkin_ok),
            checkout_ok: pick(&self.checkout_ok, &base.checkout_ok),
            renewal_policy: pick(&self.renewal_policy, &base.renewal_policy),
            status_update_ok: pick(&self.status_update_ok, &base.status_update_ok),
            offline_ok: pick(&self.offline_ok, &base.offline_ok),
        }
    }
}

/// The multi-tenant document (e.g., tenants.json).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantsDocument {
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

impl TenantsDocument {
    /// Loads the document from a JSON file. A missing file means
    /// single-tenant mode; an unreadable or malformed one is an error.
    pub fn load(path: &str) -> Result<Option<Self>, GatewayError> {
        info!("Loading tenants from '{}'.", path);
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<TenantsDocument>(&contents) {
                Ok(doc) => {
                    if let Err(e) = doc.validate() {
                        error!("Rejecting tenants file '{}': {}", path, e);
                        return Err(e);
                    }
                    info!("Loaded {} tenant entries.", doc.tenants.len());
                    Ok(Some(doc))
                }
                Err(e) => {
                    let msg = format!("Failed to parse tenants file '{path}': {e}");
                    error!("{msg}");
                    Err(GatewayError::Config(msg))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Tenants file '{}' not found. Running in single-tenant mode.",
                    path
                );
                Ok(None)
            }
            Err(e) => {
                let msg = format!("Failed to read tenants file '{path}': {e}");
                error!("{msg}");
                Err(GatewayError::Config(msg))
            }
        }
    }

    /// Checks the framing overrides of every entry: delimiters must be ASCII
    /// and an entry setting both must keep them apart.
    pub fn validate(&self) -> Result<(), GatewayError> {
        for (index, entry) in self.tenants.iter().enumerate() {
            let name = entry.tenant.as_deref().unwrap_or("<unnamed>");
            for (field, delimiter) in [
                ("message_delimiter", entry.message_delimiter),
                ("field_delimiter", entry.field_delimiter),
            ] {
                if let Some(c) = delimiter
                    && !c.is_ascii()
                {
                    return Err(GatewayError::Config(format!(
                        "tenant #{index} ('{name}'): {field} must be an ASCII character"
                    )));
                }
            }
            if let (Some(message), Some(field)) = (entry.message_delimiter, entry.field_delimiter)
                && message == field
            {
                return Err(GatewayError::Config(format!(
                    "tenant #{index} ('{name}'): message_delimiter and field_delimiter must differ"
                )));
            }
        }
        Ok(())
    }

    /// Finds the entry with the given tenant id.
    pub fn find(&self, tenant: &str) -> Option<&TenantConfig> {
        self.tenants
            .iter()
            .find(|t| t.tenant.as_deref() == Some(tenant))
    }
}

/// Fully resolved settings for one tenant, with every default filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantSettings {
    pub tenant: Option<String>,
    pub message_delimiter: char,
    pub field_delimiter: char,
    pub charset: Charset,
    pub error_detection: bool,
    pub timezone: Tz,
    pub currency: CurrencyType,
    pub locale: String,
    pub checkin_rejected_statuses: Vec<CirculationStatus>,
    pub patron_password_verification_required: bool,
    pub use_pin_for_patron_verification: bool,
    pub institution_id: String,
    pub library_name: Option<String>,
    pub terminal_location: Option<String>,
    pub supported_messages: SupportedMessages,
    pub timeout_period: u16,
    pub retries_allowed: u16,
    pub checkin_ok: bool,
    pub checkout_ok: bool,
    pub renewal_policy: bool,
    pub status_update_ok: bool,
    pub offline_ok: bool,
}

impl Default for TenantSettings {
    fn default() -> Self {
        TenantSettings::from_config(&TenantConfig::default())
    }
}

impl TenantSettings {
    /// Fills every unset field of `config` with the built-in default.
    pub fn from_config(config: &TenantConfig) -> Self {
        Self {
            tenant: config.tenant.clone(),
            message_delimiter: config.message_delimiter.unwrap_or('\r'),
            field_delimiter: config.field_delimiter.unwrap_or('|'),
            charset: config.charset.unwrap_or_default(),
            error_detection: config.error_detection_enabled.unwrap_or(false),
            timezone: config.timezone.unwrap_or(Tz::UTC),
            currency: config.currency.unwrap_or(CurrencyType::Usd),
            locale: config.locale.clone().unwrap_or_else(|| "en-US".to_string()),
            checkin_rejected_statuses: config.checkin_rejected_statuses.clone().unwrap_or_default(),
            patron_password_verification_required: config
                .patron_password_verification_required
                .unwrap_or(false),
            use_pin_for_patron_verification: config
                .use_pin_for_patron_verification
                .unwrap_or(false),
            institution_id: config.institution_id.clone().unwrap_or_default(),
            library_name: config.library_name.clone(),
            terminal_location: config.terminal_location.clone(),
            supported_messages: config
                .supported_messages
                .as_deref()
                .map(SupportedMessages::from_wire)
                .unwrap_or_default(),
            timeout_period: config.timeout_period.unwrap_or(10),
            retries_allowed: config.retries_allowed.unwrap_or(3),
            checkin_ok: config.checkin_ok.unwrap_or(true),
            checkout_ok: config.checkout_ok.unwrap_or(true),
            renewal_policy: config.renewal_policy.unwrap_or(true),
            status_update_ok: config.status_update_ok.unwrap_or(false),
            offline_ok: config.offline_ok.unwrap_or(false),
        }
    }
}

/// Holds the default tenant and an atomically replaceable snapshot of the
/// multi-tenant document.
///
/// Readers clone the inner `Arc`, so a `replace` never disturbs a resolution
/// that is already running.
#[derive(Debug)]
pub struct TenantStore {
    default_tenant: TenantConfig,
    document: RwLock<Option<Arc<TenantsDocument>>>,
}

impl TenantStore {
    pub fn new(default_tenant: TenantConfig, document: Option<TenantsDocument>) -> Self {
        Self {
            default_tenant,
            document: RwLock::new(document.map(Arc::new)),
        }
    }

    /// A store with built-in defaults and no multi-tenant document.
    pub fn single_tenant() -> Self {
        Self::new(TenantConfig::default(), None)
    }

    pub fn default_tenant(&self) -> &TenantConfig {
        &self.default_tenant
    }

    /// The current document, if any.
    pub fn snapshot(&self) -> Option<Arc<TenantsDocument>> {
        self.document.read().clone()
    }

    /// Swaps in a new document. Connections pick it up at their next resolution.
    pub fn replace(&self, document: Option<TenantsDocument>) {
        let count = document.as_ref().map(|d| d.tenants.len()).unwrap_or(0);
        *self.document.write() = document.map(Arc::new);
        info!("Tenant document replaced ({} entries).", count);
    }

    /// Resolves the effective settings for a resolver result: the result
    /// itself, over the document entry with the same tenant id, over the
    /// default tenant.
    pub fn settings_for(&self, resolved: Option<&TenantConfig>) -> TenantSettings {
        let Some(resolved) = resolved else {
            return TenantSettings::from_config(&self.default_tenant);
        };
        let snapshot = self.snapshot();
        let entry = resolved
            .tenant
            .as_deref()
            .and_then(|id| snapshot.as_deref().and_then(|doc| doc.find(id)));
        let layered = match entry {
            Some(entry) => resolved
                .merged_over(entry)
                .merged_over(&self.default_tenant),
            None => resolved.merged_over(&self.default_tenant),
        };
        TenantSettings::from_config(&layered)
    }
}
