//! Test fixtures for organizations and callers.

use crate::organizations::{CallerIdentity, Membership, OrgRole, Organization};
use uuid::Uuid;

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    fn suffix() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    /// Generate a fake email address
    pub fn email() -> String {
        format!("test-{}@example.com", Uuid::new_v4().simple())
    }

    /// Generate a fake user ID
    pub fn user_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a fake organization name with mixed casing
    pub fn org_name() -> String {
        format!("Test Org {}", suffix())
    }

    /// Generate a fake logo object key
    pub fn logo_key() -> String {
        format!("logos/{}.png", suffix())
    }
}

/// A caller together with the membership they hold, if any.
#[derive(Debug, Clone)]
pub struct TestCaller {
    pub identity: CallerIdentity,
    pub role: Option<OrgRole>,
}

impl TestCaller {
    /// Caller with a generated identity and no membership.
    pub fn generate() -> Self {
        Self {
            identity: CallerIdentity::new(fake::user_id(), fake::email()),
            role: None,
        }
    }

    /// Caller who will be granted `role`.
    pub fn with_role(role: OrgRole) -> Self {
        Self {
            role: Some(role),
            ..Self::generate()
        }
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    /// The membership this caller should hold in `org_name`, if any.
    pub fn membership(&self, org_name: &str) -> Option<Membership> {
        self.role.map(|role| {
            Membership::new(org_name, &self.identity.user_id, role).with_email(&self.identity.email)
        })
    }
}

/// Organization with a generated name, created by `created_by`.
pub fn organization(created_by: &str) -> Organization {
    Organization::new(fake::org_name(), created_by)
}
