//! Organization logo URLs.
//!
//! Logos are stored in object storage and referenced by key. Clients only
//! ever see time-limited URLs, which are regenerated on every read through
//! [`LogoResolver`]. Records that predate key storage carry only an old URL;
//! the resolver recovers the key from it and [`KeyBackfill`] writes the key
//! back in the background.

mod backfill;
mod resolver;
mod signer;

pub use backfill::{BackfillError, KeyBackfill};
pub use resolver::{LogoOutcome, LogoResolver, key_from_url};
pub use signer::HmacUrlSigner;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors from a [`UrlSigner`].
#[derive(Debug, Clone, Error)]
pub enum SignError {
    /// The object key cannot be signed.
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    /// The signing backend could not be reached or refused.
    #[error("signing unavailable: {0}")]
    Unavailable(String),
}

/// Produces time-limited access URLs for stored objects.
///
/// Implementations may fail transiently; callers treat every failure as soft.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Return a URL granting temporary read access to `key`.
    async fn presign(&self, key: &str) -> Result<String, SignError>;
}

#[async_trait]
impl<T: UrlSigner + ?Sized> UrlSigner for Arc<T> {
    async fn presign(&self, key: &str) -> Result<String, SignError> {
        (**self).presign(key).await
    }
}
