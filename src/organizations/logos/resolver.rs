//! Logo URL regeneration.

use super::UrlSigner;
use crate::organizations::types::Organization;
use tracing::{debug, info, warn};
use url::Url;

/// Recover an object key from a previously issued URL.
///
/// The key is the URL path without its leading slash, percent-decoded. Returns
/// `None` when the URL does not parse or has an empty path.
pub fn key_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let path = parsed.path().trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    let key = urlencoding::decode(path).ok()?.into_owned();
    (!key.trim().is_empty()).then_some(key)
}

/// What [`LogoResolver::resolve`] did to a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogoOutcome {
    /// A stored key was signed into a fresh URL.
    Refreshed,
    /// A key was recovered from `legacy_url` and signed. The record now
    /// carries the key; the caller should persist it.
    Recovered { key: String, legacy_url: String },
    /// Regeneration failed; the previous URL was kept.
    Stale,
    /// Nothing to resolve.
    Unchanged,
}

impl LogoOutcome {
    /// Recovered key awaiting persistence, if any.
    pub fn recovered_key(&self) -> Option<&str> {
        match self {
            Self::Recovered { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Regenerates time-limited logo URLs on organization records.
///
/// Every failure is soft: the record keeps its previous URL and the failure is
/// logged. Resolution never fails a read.
#[derive(Clone)]
pub struct LogoResolver<S: UrlSigner> {
    signer: S,
}

impl<S: UrlSigner> LogoResolver<S> {
    pub fn new(signer: S) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Refresh `org.logo_url` in place.
    pub async fn resolve(&self, org: &mut Organization) -> LogoOutcome {
        if let Some(key) = org.logo_s3_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return match self.signer.presign(key).await {
                Ok(url) => {
                    org.logo_url = Some(url);
                    debug!(org = %org.name, "Refreshed logo URL");
                    LogoOutcome::Refreshed
                }
                Err(e) => {
                    warn!(org = %org.name, error = %e, "Failed to refresh logo URL, keeping stored URL");
                    LogoOutcome::Stale
                }
            };
        }

        let Some(legacy_url) = org.logo_url.clone().filter(|u| !u.trim().is_empty()) else {
            return LogoOutcome::Unchanged;
        };

        let Some(key) = key_from_url(&legacy_url) else {
            warn!(org = %org.name, "Could not recover logo key from stored URL");
            return LogoOutcome::Stale;
        };

        match self.signer.presign(&key).await {
            Ok(url) => {
                org.logo_url = Some(url);
                org.logo_s3_key = Some(key.clone());
                info!(org = %org.name, key = %key, "Recovered logo key from legacy URL");
                LogoOutcome::Recovered { key, legacy_url }
            }
            Err(e) => {
                warn!(
                    org = %org.name,
                    key = %key,
                    error = %e,
                    "Failed to sign recovered logo key, keeping legacy URL"
                );
                LogoOutcome::Stale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::test::{CountingSigner, FailingSigner};

    fn org() -> Organization {
        Organization::new("Acme", "user-1")
    }

    #[test]
    fn test_key_from_url() {
        assert_eq!(
            key_from_url("https://bucket.s3.amazonaws.com/logos/acme.png?X-Amz-Expires=60").as_deref(),
            Some("logos/acme.png")
        );
        assert_eq!(
            key_from_url("https://cdn.test/logos/acme%20co.png").as_deref(),
            Some("logos/acme co.png")
        );
        assert_eq!(key_from_url("https://cdn.test/"), None);
        assert_eq!(key_from_url("https://cdn.test"), None);
        assert_eq!(key_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn test_stored_key_is_refreshed() {
        let signer = CountingSigner::new();
        let resolver = LogoResolver::new(signer.clone());
        let mut org = org().with_logo_key("logos/acme.png");

        assert_eq!(resolver.resolve(&mut org).await, LogoOutcome::Refreshed);
        assert_eq!(org.logo_url.as_deref(), Some("https://signed.test/logos/acme.png?n=1"));
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn test_legacy_url_is_recovered() {
        let resolver = LogoResolver::new(CountingSigner::new());
        let mut org = org().with_legacy_logo_url("https://old.test/logos/acme.png?expired=1");

        let outcome = resolver.resolve(&mut org).await;
        assert_eq!(outcome.recovered_key(), Some("logos/acme.png"));
        assert_eq!(
            outcome,
            LogoOutcome::Recovered {
                key: "logos/acme.png".into(),
                legacy_url: "https://old.test/logos/acme.png?expired=1".into(),
            }
        );
        assert_eq!(org.logo_s3_key.as_deref(), Some("logos/acme.png"));
        assert_eq!(org.logo_url.as_deref(), Some("https://signed.test/logos/acme.png?n=1"));
    }

    #[tokio::test]
    async fn test_no_logo_is_unchanged() {
        let signer = CountingSigner::new();
        let resolver = LogoResolver::new(signer.clone());
        let mut org = org();
        let before = org.clone();

        assert_eq!(resolver.resolve(&mut org).await, LogoOutcome::Unchanged);
        assert_eq!(org, before);
        assert_eq!(signer.calls(), 0);
    }

    #[tokio::test]
    async fn test_signing_failure_keeps_previous_url() {
        let resolver = LogoResolver::new(FailingSigner);

        let mut keyed = org().with_logo_key("logos/acme.png");
        keyed.logo_url = Some("https://old.test/logos/acme.png".into());
        assert_eq!(resolver.resolve(&mut keyed).await, LogoOutcome::Stale);
        assert_eq!(keyed.logo_url.as_deref(), Some("https://old.test/logos/acme.png"));

        let mut legacy = org().with_legacy_logo_url("https://old.test/logos/acme.png");
        assert_eq!(resolver.resolve(&mut legacy).await, LogoOutcome::Stale);
        assert_eq!(legacy.logo_url.as_deref(), Some("https://old.test/logos/acme.png"));
        assert!(legacy.logo_s3_key.is_none());
    }

    #[tokio::test]
    async fn test_unrecoverable_url_is_stale() {
        let signer = CountingSigner::new();
        let resolver = LogoResolver::new(signer.clone());
        let mut org = org().with_legacy_logo_url("https://old.test/");

        assert_eq!(resolver.resolve(&mut org).await, LogoOutcome::Stale);
        assert_eq!(org.logo_url.as_deref(), Some("https://old.test/"));
        assert_eq!(signer.calls(), 0);
    }
}
