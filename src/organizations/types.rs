//! Organization records and roles.
//!
//! Records serialize with camelCase attribute names; that is the on-table
//! format as well as the JSON format handed to routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role a user holds within an organization.
///
/// `Admin` carries every `Member` privilege.
///
/// ```rust
/// use photocomp::organizations::OrgRole;
///
/// assert!(OrgRole::Admin.has_at_least(&OrgRole::Member));
/// assert!(!OrgRole::Member.has_at_least(&OrgRole::Admin));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    /// Regular member.
    #[default]
    Member,
    /// Organization administrator.
    Admin,
}

impl OrgRole {
    /// Get the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    /// Get the hierarchy level (higher = more permissions).
    #[must_use]
    pub fn hierarchy_level(&self) -> u8 {
        match self {
            Self::Member => 1,
            Self::Admin => 2,
        }
    }

    /// Check if this role has at least the permissions of another role.
    #[must_use]
    pub fn has_at_least(&self, other: &Self) -> bool {
        self.hierarchy_level() >= other.hierarchy_level()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Error returned when parsing a role string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    invalid_value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid role: '{}' (expected: member or admin)", self.invalid_value)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for OrgRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An organization's canonical record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    /// Name as submitted; keys use the upper-cased form.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// Last issued access URL for the logo. Time-limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Object key of the logo; the source of truth when present.
    #[serde(default, rename = "logoS3Key", skip_serializing_if = "Option::is_none")]
    pub logo_s3_key: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// New organization record with a fresh ID.
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            website: None,
            contact_email: None,
            logo_url: None,
            logo_s3_key: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    #[must_use]
    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_logo_key(mut self, key: impl Into<String>) -> Self {
        self.logo_s3_key = Some(key.into());
        self
    }

    /// Reference the logo only by a previously issued URL.
    #[must_use]
    pub fn with_legacy_logo_url(mut self, url: impl Into<String>) -> Self {
        self.logo_url = Some(url.into());
        self
    }
}

/// A user's relationship with an organization.
///
/// The item exists exactly while the user is a member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: String,
    /// Organization name as submitted at creation.
    pub org_name: String,
    pub role: OrgRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(org_name: impl Into<String>, user_id: impl Into<String>, role: OrgRole) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            org_name: org_name.into(),
            role,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Admin grant, as issued to an organization's creator.
    pub fn admin(org_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::new(org_name, user_id, OrgRole::Admin)
    }

    pub fn member(org_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::new(org_name, user_id, OrgRole::Member)
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Fields a caller may change on an organization.
///
/// `None` and blank strings mean "leave as is".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default, rename = "logoS3Key")]
    pub logo_s3_key: Option<String>,
}

/// One page of the public organization listing.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPage {
    pub organizations: Vec<Organization>,
    /// Pass back to fetch the next page; `None` once exhausted.
    pub next_cursor: Option<super::storage::Cursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(OrgRole::Admin.has_at_least(&OrgRole::Member));
        assert!(OrgRole::Admin.has_at_least(&OrgRole::Admin));
        assert!(!OrgRole::Member.has_at_least(&OrgRole::Admin));
        assert!(OrgRole::Admin.is_admin());
        assert!(!OrgRole::Member.is_admin());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("ADMIN".parse::<OrgRole>().unwrap(), OrgRole::Admin);
        assert_eq!("Member".parse::<OrgRole>().unwrap(), OrgRole::Member);
        assert!("owner".parse::<OrgRole>().is_err());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&OrgRole::Admin).unwrap(), "\"admin\"");
        let parsed: OrgRole = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(parsed, OrgRole::Member);
    }

    #[test]
    fn test_organization_attribute_names() {
        let org = Organization::new("Acme", "u1")
            .with_contact_email("hi@acme.test")
            .with_logo_key("logos/acme.png");
        let json = serde_json::to_value(&org).unwrap();

        assert_eq!(json["name"], "Acme");
        assert_eq!(json["contactEmail"], "hi@acme.test");
        assert_eq!(json["logoS3Key"], "logos/acme.png");
        assert_eq!(json["createdBy"], "u1");
        assert!(json.get("logoUrl").is_none());
    }

    #[test]
    fn test_update_deserializes_partial_body() {
        let update: OrganizationUpdate =
            serde_json::from_str(r#"{"description": "Photos", "website": ""}"#).unwrap();
        assert_eq!(update.description.as_deref(), Some("Photos"));
        assert_eq!(update.website.as_deref(), Some(""));
        assert!(update.contact_email.is_none());
    }
}
