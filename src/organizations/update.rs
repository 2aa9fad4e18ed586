//! Partial organization updates.

use super::error::{OrganizationError, Result};
use super::storage::AttributeChange;
use super::types::OrganizationUpdate;
use chrono::{DateTime, Utc};

/// Accumulates attribute changes for fields that are present and non-blank.
///
/// ```rust
/// use photocomp::organizations::UpdateBuilder;
///
/// let changes = UpdateBuilder::new()
///     .field("description", Some("Photo club"))
///     .field("website", Some("   "))
///     .build()
///     .unwrap();
///
/// // description + updatedAt
/// assert_eq!(changes.len(), 2);
/// assert!(UpdateBuilder::new().field("website", None::<&str>).build().is_err());
/// ```
#[derive(Debug, Default)]
#[must_use]
pub struct UpdateBuilder {
    changes: Vec<AttributeChange>,
    touched: bool,
    stamp: Option<DateTime<Utc>>,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `attribute` if `value` is present and non-blank.
    pub fn field(mut self, attribute: &str, value: Option<impl AsRef<str>>) -> Self {
        if let Some(value) = value {
            let value: &str = value.as_ref();
            if !value.trim().is_empty() {
                self.changes.push(AttributeChange::set(attribute, value));
                self.touched = true;
            }
        }
        self
    }

    /// Remove `attribute`. Does not by itself make the update non-empty.
    pub fn remove(mut self, attribute: &str) -> Self {
        self.changes.push(AttributeChange::remove(attribute));
        self
    }

    /// Use `at` as the update timestamp instead of the current time.
    pub fn stamped_at(mut self, at: DateTime<Utc>) -> Self {
        self.stamp = Some(at);
        self
    }

    /// Build from an [`OrganizationUpdate`].
    ///
    /// A new `logoUrl` without a `logoS3Key` clears the stored key so the URL
    /// becomes the only logo reference.
    pub fn from_update(update: &OrganizationUpdate) -> Self {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        let builder = Self::new()
            .field("description", update.description.as_deref())
            .field("website", update.website.as_deref())
            .field("contactEmail", update.contact_email.as_deref())
            .field("logoUrl", update.logo_url.as_deref())
            .field("logoS3Key", update.logo_s3_key.as_deref());

        if has(&update.logo_url) && !has(&update.logo_s3_key) {
            builder.remove("logoS3Key")
        } else {
            builder
        }
    }

    /// Finish, appending `updatedAt`.
    ///
    /// # Errors
    ///
    /// `NoFieldsProvided` if no field qualified.
    pub fn build(self) -> Result<Vec<AttributeChange>> {
        if !self.touched {
            return Err(OrganizationError::NoFieldsProvided);
        }
        let mut changes = self.changes;
        let at = self.stamp.unwrap_or_else(Utc::now);
        changes.push(AttributeChange::set("updatedAt", at.to_rfc3339()));
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(changes: &[AttributeChange]) -> Vec<&str> {
        changes.iter().map(AttributeChange::attribute).collect()
    }

    #[test]
    fn test_blank_and_missing_fields_are_skipped() {
        let update = OrganizationUpdate {
            description: Some("".into()),
            website: Some("  \t".into()),
            contact_email: None,
            ..Default::default()
        };
        let err = UpdateBuilder::from_update(&update).build().unwrap_err();
        assert!(matches!(err, OrganizationError::NoFieldsProvided));
    }

    #[test]
    fn test_present_fields_are_written() {
        let update = OrganizationUpdate {
            description: Some("Photo club".into()),
            contact_email: Some("hi@acme.test".into()),
            ..Default::default()
        };
        let changes = UpdateBuilder::from_update(&update).build().unwrap();
        assert_eq!(attributes(&changes), vec!["description", "contactEmail", "updatedAt"]);
        assert_eq!(changes[0], AttributeChange::set("description", "Photo club"));
    }

    #[test]
    fn test_logo_url_alone_clears_key() {
        let update = OrganizationUpdate {
            logo_url: Some("https://cdn.test/logos/new.png".into()),
            ..Default::default()
        };
        let changes = UpdateBuilder::from_update(&update).build().unwrap();
        assert!(changes.contains(&AttributeChange::remove("logoS3Key")));
    }

    #[test]
    fn test_logo_key_with_url_is_kept() {
        let update = OrganizationUpdate {
            logo_url: Some("https://cdn.test/logos/new.png".into()),
            logo_s3_key: Some("logos/new.png".into()),
            ..Default::default()
        };
        let changes = UpdateBuilder::from_update(&update).build().unwrap();
        assert!(changes.contains(&AttributeChange::set("logoS3Key", "logos/new.png")));
        assert!(!changes.contains(&AttributeChange::remove("logoS3Key")));
    }

    #[test]
    fn test_remove_alone_is_empty() {
        let err = UpdateBuilder::new().remove("logoS3Key").build().unwrap_err();
        assert!(matches!(err, OrganizationError::NoFieldsProvided));
    }

    #[test]
    fn test_stamp() {
        let at = Utc::now();
        let changes = UpdateBuilder::new()
            .field("website", Some("https://acme.test"))
            .stamped_at(at)
            .build()
            .unwrap();
        assert_eq!(changes.last(), Some(&AttributeChange::set("updatedAt", at.to_rfc3339())));
    }
}
