//! Organizations, memberships and organization-scoped authorization.
//!
//! This module provides the data-access core for multi-tenant organizations:
//! - **Single-table storage** - Organizations and user relationships share one
//!   table behind the [`TableStore`] trait, with a secondary index for listings
//! - **Logo URLs** - Time-limited logo URLs regenerated on every read, with
//!   recovery of keys from legacy URLs
//! - **Authorization** - Member and admin checks plus axum middleware
//!
//! # Features
//!
//! - `test-organizations` - Failing and counting test doubles
//!
//! # Example
//!
//! ```rust,ignore
//! use photocomp::organizations::{
//!     AuthorizationGate, HmacUrlSigner, InMemoryTable, Organization, OrganizationStore,
//!     require_org_admin,
//! };
//! use std::sync::Arc;
//!
//! let signer = HmacUrlSigner::from_config(&config.logos)?;
//! let store = Arc::new(OrganizationStore::new(Arc::new(InMemoryTable::new()), signer));
//!
//! store.register_organization(Organization::new("Acme", "user_123"), None).await?;
//!
//! let gate = Arc::new(AuthorizationGate::new(store.clone()));
//! let admin_routes = Router::new()
//!     .route("/orgs/{orgId}/settings", put(update_settings))
//!     .route_layer(axum::middleware::from_fn_with_state(gate, require_org_admin));
//! ```

mod error;
mod gate;
pub mod keys;
pub mod logos;
mod middleware;
mod repository;
pub mod storage;
mod types;
mod update;


// Error exports
pub use error::{ErrorKind, OrganizationError, Result};

// Store exports
pub use repository::{OrganizationStore, PUBLIC_PAGE_SIZE};
pub use storage::{Cursor, InMemoryTable, StoreError, TableStore};
pub use update::UpdateBuilder;

// Logo exports
pub use logos::{HmacUrlSigner, LogoOutcome, LogoResolver, SignError, UrlSigner};

// Type exports
pub use types::{
    Membership, OrgRole, Organization, OrganizationPage, OrganizationUpdate, ParseRoleError,
};

// Authorization exports
pub use gate::{AuthorizationGate, CallerIdentity, OrgRouteParams};
pub use middleware::{CurrentMembership, require_org_admin, require_org_member};
