//! PhotoComp access layer
//!
//! Organization membership, authorization and single-table data access for
//! the PhotoComp photo-sharing API. Built on Axum and Tokio.
//!
//! # Features
//!
//! - **Organizations**: Organizations and memberships packed into one table
//!   with a secondary index for listings
//! - **Logo URLs**: Time-limited signed logo URLs regenerated on every read
//! - **Authorization**: Member/admin checks and axum middleware for
//!   organization-scoped routes
//! - **Testing**: HTTP scenario testing utilities
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use photocomp::organizations::{HmacUrlSigner, InMemoryTable, Organization, OrganizationStore};
//! use photocomp::ConfigBuilder;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     photocomp::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let signer = HmacUrlSigner::from_config(&config.logos)?;
//!     let store = OrganizationStore::new(Arc::new(InMemoryTable::new()), signer);
//!
//!     store
//!         .register_organization(Organization::new("Acme", "user_1"), None)
//!         .await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
pub mod organizations;
pub mod testing;
pub mod utils;

// Re-exports for public API
pub use config::{Config, ConfigBuilder, LoggingConfig, LogoConfig, MAX_URL_TTL_SECONDS};
pub use error::{PhotoCompError, Result};
pub use testing::{TestCaller, fake};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "photocomp=debug")
/// - `PHOTOCOMP_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("PHOTOCOMP_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing from [`Config::logging`]
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
