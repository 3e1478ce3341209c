// src/core/tenant/resolver.rs

//! The tenant resolution strategies.
//!
//! Each strategy is stateless and only looks at the facts in the
//! [`ResolutionContext`]. A strategy returns `Ok(None)` when nothing matches
//! and an error for unusable input; the engine treats both as "no match".

use super::config::{TenantConfig, TenantsDocument};
use crate::core::GatewayError;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, warn};

/// The delimiter the username-prefix strategy splits on by default.
pub const DEFAULT_USERNAME_PREFIX_DELIMITER: &str = "__";

/// When a resolver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionPhase {
    /// At accept time: only the port and the peer address are known.
    Connect,
    /// After a Login message: the username and location code are known.
    Login,
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPhase::Connect => f.write_str("connect"),
            ResolutionPhase::Login => f.write_str("login"),
        }
    }
}

/// The facts available in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFacts<'a> {
    Connect {
        local_port: u16,
        remote_addr: &'a str,
    },
    Login {
        username: &'a str,
        location_code: Option<&'a str>,
    },
}

/// Input to a resolution run.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub facts: ResolutionFacts<'a>,
    pub tenants: Option<&'a TenantsDocument>,
}

impl<'a> ResolutionContext<'a> {
    pub fn connect(
        local_port: u16,
        remote_addr: &'a str,
        tenants: Option<&'a TenantsDocument>,
    ) -> Self {
        Self {
            facts: ResolutionFacts::Connect {
                local_port,
                remote_addr,
            },
            tenants,
        }
    }

    pub fn login(
        username: &'a str,
        location_code: Option<&'a str>,
        tenants: Option<&'a TenantsDocument>,
    ) -> Self {
        Self {
            facts: ResolutionFacts::Login {
                username,
                location_code,
            },
            tenants,
        }
    }

    pub fn phase(&self) -> ResolutionPhase {
        match self.facts {
            ResolutionFacts::Connect { .. } => ResolutionPhase::Connect,
            ResolutionFacts::Login { .. } => ResolutionPhase::Login,
        }
    }
}

/// A single resolution strategy.
pub trait TenantResolver: Send + Sync + fmt::Debug {
    /// The configuration name of the strategy.
    fn name(&self) -> &'static str;

    /// The phase the strategy runs in.
    fn phase(&self) -> ResolutionPhase;

    /// Looks for a tenant in `tenants` using the facts in `ctx`.
    fn resolve(
        &self,
        ctx: &ResolutionContext<'_>,
        tenants: &TenantsDocument,
    ) -> Result<Option<TenantConfig>, GatewayError>;
}

/// Matches the local listening port against each entry's `port`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortResolver;

impl TenantResolver for PortResolver {
    fn name(&self) -> &'static str {
        "port"
    }

    fn phase(&self) -> ResolutionPhase {
        ResolutionPhase::Connect
    }

    fn resolve(
        &self,
        ctx: &ResolutionContext<'_>,
        tenants: &TenantsDocument,
    ) -> Result<Option<TenantConfig>, GatewayError> {
        let ResolutionFacts::Connect { local_port, .. } = ctx.facts else {
            return Ok(None);
        };
        let found = tenants.tenants.iter().find(|entry| {
            entry
                .port
                .as_deref()
                .and_then(|p| p.trim().parse::<u16>().ok())
                == Some(local_port)
        });
        Ok(found.cloned())
    }
}

/// Matches the peer address against each entry's `sc_subnet` CIDR block.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubnetResolver;

impl TenantResolver for SubnetResolver {
    fn name(&self) -> &'static str {
        "subnet"
    }

    fn phase(&self) -> ResolutionPhase {
        ResolutionPhase::Connect
    }

    fn resolve(
        &self,
        ctx: &ResolutionContext<'_>,
        tenants: &TenantsDocument,
    ) -> Result<Option<TenantConfig>, GatewayError> {
        let ResolutionFacts::Connect { remote_addr, .. } = ctx.facts else {
            return Ok(None);
        };
        let addr = parse_remote_addr(remote_addr)?;
        for entry in &tenants.tenants {
            let Some(subnet) = entry.sc_subnet.as_deref() else {
                continue;
            };
            match cidr_contains(subnet, addr) {
                Ok(true) => return Ok(Some(entry.clone())),
                Ok(false) => {}
                Err(e) => warn!("Skipping tenant entry with bad subnet: {}", e),
            }
        }
        Ok(None)
    }
}

/// Matches the SC-reported location code against each entry's `location_codes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationCodeResolver;

impl TenantResolver for LocationCodeResolver {
    fn name(&self) -> &'static str {
        "location_code"
    }

    fn phase(&self) -> ResolutionPhase {
        ResolutionPhase::Login
    }

    fn resolve(
        &self,
        ctx: &ResolutionContext<'_>,
        tenants: &TenantsDocument,
    ) -> Result<Option<TenantConfig>, GatewayError> {
        let ResolutionFacts::Login {
            location_code: Some(location_code),
            ..
        } = ctx.facts
        else {
            return Ok(None);
        };
        let found = tenants
            .tenants
            .iter()
            .find(|entry| entry.location_codes.iter().any(|c| c == location_code));
        Ok(found.cloned())
    }
}

/// Treats the part of the login username before the delimiter as the
/// tenant id, without consulting the document entries.
#[derive(Debug, Clone)]
pub struct UsernamePrefixResolver {
    delimiter: String,
}

impl Default for UsernamePrefixResolver {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME_PREFIX_DELIMITER)
    }
}

impl UsernamePrefixResolver {
    pub fn new(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        let delimiter = if delimiter.is_empty() {
            DEFAULT_USERNAME_PREFIX_DELIMITER.to_string()
        } else {
            delimiter
        };
        Self { delimiter }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

impl TenantResolver for UsernamePrefixResolver {
    fn name(&self) -> &'static str {
        "username_prefix"
    }

    fn phase(&self) -> ResolutionPhase {
        ResolutionPhase::Login
    }

    fn resolve(
        &self,
        ctx: &ResolutionContext<'_>,
        _tenants: &TenantsDocument,
    ) -> Result<Option<TenantConfig>, GatewayError> {
        let ResolutionFacts::Login { username, .. } = ctx.facts else {
            return Ok(None);
        };
        Ok(split_username(username, &self.delimiter)
            .map(|(prefix, _)| TenantConfig::named(prefix)))
    }
}

/// Splits `username` into `(prefix, rest)` on the first `delimiter`.
/// An empty prefix is not a tenant id.
pub fn split_username<'a>(username: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    username
        .split_once(delimiter)
        .filter(|(prefix, _)| !prefix.is_empty())
}

fn parse_remote_addr(remote_addr: &str) -> Result<IpAddr, GatewayError> {
    let trimmed = remote_addr.trim();
    trimmed
        .parse::<SocketAddr>()
        .map(|sa| sa.ip())
        .or_else(|_| trimmed.parse::<IpAddr>())
        .map(|ip| ip.to_canonical())
        .map_err(|_| {
            GatewayError::Resolution(format!("malformed remote address '{remote_addr}'"))
        })
}

/// True if `addr` lies inside the CIDR block `cidr` (`a.b.c.d/n`, an IPv6
/// block, or a bare address meaning a single host).
pub fn cidr_contains(cidr: &str, addr: IpAddr) -> Result<bool, GatewayError> {
    let bad = || GatewayError::Resolution(format!("malformed CIDR block '{cidr}'"));
    let (network, prefix) = match cidr.trim().split_once('/') {
        Some((network, prefix)) => (network, Some(prefix)),
        None => (cidr.trim(), None),
    };
    let network: IpAddr = network.parse().map_err(|_| bad())?;
    let network = network.to_canonical();
    let max_prefix = if network.is_ipv4() { 32 } else { 128 };
    let prefix: u32 = match prefix {
        Some(p) => p.parse().map_err(|_| bad())?,
        None => max_prefix,
    };
    if prefix > max_prefix {
        return Err(bad());
    }

    let matched = match (network, addr) {
        (IpAddr::V4(net), IpAddr::V4(ip)) => {
            let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            u32::from(net) & mask == u32::from(ip) & mask
        }
        (IpAddr::V6(net), IpAddr::V6(ip)) => {
            let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
            u128::from(net) & mask == u128::from(ip) & mask
        }
        _ => false,
    };
    debug!("CIDR {} contains {}: {}", cidr, addr, matched);
    Ok(matched)
}

/// Builds a strategy from its configuration name. Separators and case are
/// ignored, so `location_code`, `location-code` and `locationCode` are equal.
pub fn resolver_by_name(name: &str, username_delimiter: &str) -> Option<Box<dyn TenantResolver>> {
    let normalized: String = name
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    match normalized.as_str() {
        "port" => Some(Box::new(PortResolver)),
        "subnet" => Some(Box::new(SubnetResolver)),
        "locationcode" => Some(Box::new(LocationCodeResolver)),
        "usernameprefix" => Some(Box::new(UsernamePrefixResolver::new(username_delimiter))),
        _ => None,
    }
}
