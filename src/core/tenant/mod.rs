// src/core/tenant/mod.rs

//! Per-connection tenant selection: configuration layers, resolution
//! strategies and the engine that chains them.

pub mod config;
pub mod engine;
pub mod resolver;

pub use config::{TenantConfig, TenantSettings, TenantStore, TenantsDocument};
pub use engine::TenantResolutionEngine;
pub use resolver::{
    LocationCodeResolver, PortResolver, ResolutionContext, ResolutionFacts, ResolutionPhase,
    SubnetResolver, TenantResolver, UsernamePrefixResolver,
};
