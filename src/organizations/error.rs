//! Organization error types.

use super::storage::StoreError;
use crate::error::PhotoCompError;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Coarse classification of an [`OrganizationError`].
///
/// Boundary layers map on this rather than on individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A conditional create found the key already occupied.
    AlreadyExists,
    /// A lookup or conditional update matched nothing.
    NotFound,
    /// Missing identifier or nothing to update.
    InvalidInput,
    /// Authorization denied.
    Forbidden,
    /// Backend failure not otherwise classified.
    Storage,
}

/// Errors that can occur during organization operations.
#[derive(Debug, Error)]
pub enum OrganizationError {
    /// An organization already occupies this name.
    #[error("Organization already exists: {name}")]
    AlreadyExists {
        /// The requested name.
        name: String,
    },

    /// Organization not found.
    #[error("Organization not found: {name}")]
    OrganizationNotFound {
        /// The name that was not found.
        name: String,
    },

    /// No relationship between the user and the organization.
    #[error("Member {user_id} not found in organization {name}")]
    MembershipNotFound {
        /// Organization name.
        name: String,
        /// User ID.
        user_id: String,
    },

    /// An identifier used to derive a storage key was blank.
    #[error("Invalid identifier: {field} must not be empty")]
    InvalidIdentifier {
        /// Which identifier was blank.
        field: &'static str,
    },

    /// A partial update carried no usable field.
    #[error("No valid fields provided to update")]
    NoFieldsProvided,

    /// The request did not name an organization at all.
    #[error("Organization ID is missing in request parameters")]
    MissingOrgIdentifier,

    /// The caller has no relationship with the organization.
    #[error("You are not a member of this organization")]
    NotMember {
        /// Organization name.
        name: String,
    },

    /// The caller is a member but not an admin.
    #[error("Only an Org Admin can perform this action. Please talk to your Admin for more information")]
    NotAdmin {
        /// Organization name.
        name: String,
    },

    /// Storage backend failure.
    #[error("Failed to {operation}: {source}")]
    Storage {
        /// The store operation that failed.
        operation: &'static str,
        /// Underlying backend error.
        #[source]
        source: StoreError,
    },
}

impl OrganizationError {
    /// Create an already exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    /// Create an organization not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::OrganizationNotFound { name: name.into() }
    }

    /// Create a membership not found error.
    pub fn membership_not_found(name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::MembershipNotFound {
            name: name.into(),
            user_id: user_id.into(),
        }
    }

    /// Wrap a backend error with the operation that produced it.
    pub fn storage(operation: &'static str, source: StoreError) -> Self {
        Self::Storage { operation, source }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::OrganizationNotFound { .. } | Self::MembershipNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::InvalidIdentifier { .. }
            | Self::NoFieldsProvided
            | Self::MissingOrgIdentifier => ErrorKind::InvalidInput,
            Self::NotMember { .. } | Self::NotAdmin { .. } => ErrorKind::Forbidden,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Stable machine-readable code, distinct per variant.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "already_exists",
            Self::OrganizationNotFound { .. } => "organization_not_found",
            Self::MembershipNotFound { .. } => "membership_not_found",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::NoFieldsProvided => "no_fields_provided",
            Self::MissingOrgIdentifier => "missing_org_identifier",
            Self::NotMember { .. } => "not_member",
            Self::NotAdmin { .. } => "not_admin",
            Self::Storage { .. } => "storage_error",
        }
    }
}

impl From<OrganizationError> for PhotoCompError {
    fn from(err: OrganizationError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::AlreadyExists => PhotoCompError::Conflict(msg),
            ErrorKind::NotFound => PhotoCompError::NotFound(msg),
            ErrorKind::InvalidInput => PhotoCompError::BadRequest(msg),
            ErrorKind::Forbidden => PhotoCompError::Forbidden(msg),
            ErrorKind::Storage => PhotoCompError::Internal(msg),
        }
    }
}

impl IntoResponse for OrganizationError {
    fn into_response(self) -> Response {
        let code = self.code();
        PhotoCompError::from(self).into_response_with_code(Some(code))
    }
}

/// Result type for organization operations.
pub type Result<T> = std::result::Result<T, OrganizationError>;
