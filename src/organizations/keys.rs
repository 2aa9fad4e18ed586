//! Single-table key schema.
//!
//! Every entity lives in one table. The primary key pair `(PK, SK)` and the
//! secondary index pair `(GSI1PK, GSI1SK)` are derived here and nowhere else:
//!
//! | Entity       | PK             | SK             | GSI1PK         | GSI1SK         |
//! |--------------|----------------|----------------|----------------|----------------|
//! | Organization | `ORG#<NAME>`   | `ENTITY`       | `ORG`          | `ORG#<NAME>`   |
//! | Membership   | `USER#<id>`    | `ORG#<NAME>`   | `ORG#<NAME>`   | `USER#<id>`    |
//!
//! `<NAME>` is the organization name upper-cased, so names key
//! case-insensitively while the record keeps the submitted casing.

use super::error::{OrganizationError, Result};
use serde::{Deserialize, Serialize};

/// Partition key attribute.
pub const PK: &str = "PK";
/// Sort key attribute.
pub const SK: &str = "SK";
/// Secondary index partition attribute.
pub const GSI1PK: &str = "GSI1PK";
/// Secondary index sort attribute.
pub const GSI1SK: &str = "GSI1SK";

/// Sort key of an organization's canonical record.
pub const ENTITY_SORT_KEY: &str = "ENTITY";
/// Prefix for organization-derived keys.
pub const ORG_PREFIX: &str = "ORG#";
/// Prefix for user-derived keys.
pub const USER_PREFIX: &str = "USER#";
/// Index partition holding every organization.
pub const ORG_LISTING_PARTITION: &str = "ORG";

/// Primary key of a single item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableKey {
    pub pk: String,
    pub sk: String,
}

/// Secondary index projection of an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    pub gsi1pk: String,
    pub gsi1sk: String,
}

/// Upper-case an organization name for keying.
pub fn normalize_org_name(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(OrganizationError::InvalidIdentifier {
            field: "organization name",
        });
    }
    Ok(name.to_uppercase())
}

fn check_user_id(user_id: &str) -> Result<&str> {
    if user_id.trim().is_empty() {
        return Err(OrganizationError::InvalidIdentifier { field: "user id" });
    }
    Ok(user_id)
}

/// `ORG#<NAME>`
pub fn org_partition(name: &str) -> Result<String> {
    Ok(format!("{ORG_PREFIX}{}", normalize_org_name(name)?))
}

/// `USER#<id>`
pub fn user_partition(user_id: &str) -> Result<String> {
    Ok(format!("{USER_PREFIX}{}", check_user_id(user_id)?))
}

/// Key of an organization's canonical record.
pub fn org_key(name: &str) -> Result<TableKey> {
    Ok(TableKey {
        pk: org_partition(name)?,
        sk: ENTITY_SORT_KEY.to_string(),
    })
}

/// Index entry placing an organization in the public listing.
pub fn org_listing_key(name: &str) -> Result<IndexKey> {
    Ok(IndexKey {
        gsi1pk: ORG_LISTING_PARTITION.to_string(),
        gsi1sk: org_partition(name)?,
    })
}

/// Key of the relationship item between a user and an organization.
pub fn membership_key(name: &str, user_id: &str) -> Result<TableKey> {
    Ok(TableKey {
        pk: user_partition(user_id)?,
        sk: org_partition(name)?,
    })
}

/// Index entry placing a relationship under its organization's member list.
pub fn membership_index_key(name: &str, user_id: &str) -> Result<IndexKey> {
    Ok(IndexKey {
        gsi1pk: org_partition(name)?,
        gsi1sk: user_partition(user_id)?,
    })
}
