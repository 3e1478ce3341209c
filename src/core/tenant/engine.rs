// src/core/tenant/engine.rs

//! The ordered chain of tenant resolvers.

use super::config::TenantConfig;
use super::resolver::{ResolutionContext, TenantResolver, resolver_by_name};
use crate::core::metrics;
use tracing::{debug, warn};

/// Picks the tenant configuration for a connection in a given phase.
///
/// The resolver list is fixed at construction. Resolution never fails: a
/// resolver error counts as "no match" and is only logged.
#[derive(Debug, Default)]
pub struct TenantResolutionEngine {
    resolvers: Vec<Box<dyn TenantResolver>>,
}

impl TenantResolutionEngine {
    /// Builds an engine from already constructed resolvers, dropping any
    /// resolver whose name was already seen.
    pub fn new(resolvers: Vec<Box<dyn TenantResolver>>) -> Self {
        let mut unique: Vec<Box<dyn TenantResolver>> = Vec::with_capacity(resolvers.len());
        for resolver in resolvers {
            if unique.iter().any(|r| r.name() == resolver.name()) {
                warn!("Duplicate tenant resolver '{}' ignored.", resolver.name());
                continue;
            }
            unique.push(resolver);
        }
        Self { resolvers: unique }
    }

    /// Builds an engine from configured resolver names. Unknown names are
    /// logged and skipped.
    pub fn from_names<S: AsRef<str>>(names: &[S], username_delimiter: &str) -> Self {
        let resolvers = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let resolver = resolver_by_name(name, username_delimiter);
                if resolver.is_none() {
                    warn!("Unknown tenant resolver '{}' ignored.", name);
                }
                resolver
            })
            .collect();
        Self::new(resolvers)
    }

    /// The enabled resolver names, in order.
    pub fn resolver_names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Runs the resolvers of the context's phase in order and returns the
    /// first match. Without a multi-tenant document this is a no-op.
    pub fn resolve(&self, ctx: &ResolutionContext<'_>) -> Option<TenantConfig> {
        let tenants = ctx.tenants?;
        let phase = ctx.phase();
        for resolver in self.resolvers.iter().filter(|r| r.phase() == phase) {
            match resolver.resolve(ctx, tenants) {
                Ok(Some(found)) => {
                    debug!(
                        "Tenant resolver '{}' matched tenant {:?} in {} phase.",
                        resolver.name(),
                        found.tenant,
                        phase
                    );
                    metrics::TENANT_RESOLUTIONS_TOTAL
                        .with_label_values(&[resolver.name()])
                        .inc();
                    return Some(found);
                }
                Ok(None) => {}
                Err(e) => warn!("Tenant resolver '{}' failed: {}", resolver.name(), e),
            }
        }
        debug!("No tenant resolver matched in {} phase.", phase);
        None
    }
}
