//! Testing utilities for organization-scoped services
//!
//! This module provides:
//! - HTTP scenario testing against an axum `Router` without running a server
//! - Callers that arrive already authenticated
//! - Fake data helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use photocomp::testing::{self, TestCaller};
//! use photocomp::organizations::OrgRole;
//!
//! #[tokio::test]
//! async fn members_cannot_change_settings() {
//!     let member = TestCaller::with_role(OrgRole::Member);
//!     // ... grant `member.membership("Acme")` in the store behind `app`
//!
//!     testing::put(app, "/orgs/Acme/settings")
//!         .caller(member.identity.clone())
//!         .execute()
//!         .await
//!         .assert_forbidden();
//! }
//! ```

mod fixtures;
mod scenario;

pub use fixtures::{TestCaller, fake, organization};
pub use scenario::{Scenario, ScenarioAssert, delete, get, post, put};
