//! HMAC-signed object URLs.
//!
//! URLs have the form `<base>/<key>?expires=<unix>&signature=<sig>` where
//! `sig` is the URL-safe base64 HMAC-SHA256 of `"<key>\n<expires>"`. The key
//! sits directly under the base origin so that [`key_from_url`] recovers it
//! from the path.
//!
//! [`key_from_url`]: super::key_from_url

use super::{SignError, UrlSigner};
use crate::config::{LogoConfig, MAX_URL_TTL_SECONDS};
use crate::error::PhotoCompError;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// [`UrlSigner`] issuing HMAC-SHA256 signed URLs.
///
/// ```rust
/// use photocomp::organizations::logos::HmacUrlSigner;
/// use chrono::Utc;
///
/// let signer = HmacUrlSigner::new("https://logos.example.com", "secret", 3600).unwrap();
/// let now = Utc::now();
/// let url = signer.presign_at("logos/acme.png", now).unwrap();
/// assert!(signer.verify(&url, now));
/// ```
#[derive(Clone)]
pub struct HmacUrlSigner {
    base_url: Url,
    secret: Vec<u8>,
    ttl_seconds: u64,
}

impl HmacUrlSigner {
    /// Create a signer.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the base URL does not parse or cannot carry a
    /// path, or the secret is empty. The TTL is clamped to seven days.
    pub fn new(
        base_url: &str,
        secret: impl Into<Vec<u8>>,
        ttl_seconds: u64,
    ) -> Result<Self, PhotoCompError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PhotoCompError::bad_request(format!("Invalid logo base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PhotoCompError::bad_request(
                "Logo base URL cannot carry an object path",
            ));
        }
        let secret = secret.into();
        if secret.is_empty() {
            return Err(PhotoCompError::bad_request(
                "Logo signing secret must not be empty",
            ));
        }
        Ok(Self {
            base_url,
            secret,
            ttl_seconds: ttl_seconds.clamp(1, MAX_URL_TTL_SECONDS),
        })
    }

    /// Create a signer from validated configuration.
    pub fn from_config(config: &LogoConfig) -> Result<Self, PhotoCompError> {
        Self::new(
            &config.base_url,
            config.signing_secret.as_bytes(),
            config.url_ttl_seconds,
        )
    }

    /// Lifetime of issued URLs.
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_seconds as i64)
    }

    fn signature(&self, key: &str, expires: i64) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Sign `key` as of `now`.
    pub fn presign_at(&self, key: &str, now: DateTime<Utc>) -> Result<String, SignError> {
        let key = key.trim_start_matches('/');
        if key.trim().is_empty() {
            return Err(SignError::InvalidKey(key.to_string()));
        }

        let expires = (now + self.ttl()).timestamp();
        let signature = URL_SAFE_NO_PAD.encode(self.signature(key, expires));

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SignError::InvalidKey(key.to_string()))?;
            segments.clear();
            segments.extend(key.split('/'));
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);

        Ok(url.into())
    }

    /// Expiry instant carried by a URL this signer issued.
    pub fn expires_at(url: &str) -> Option<DateTime<Utc>> {
        let url = Url::parse(url).ok()?;
        let expires = url
            .query_pairs()
            .find(|(name, _)| name == "expires")?
            .1
            .parse::<i64>()
            .ok()?;
        DateTime::from_timestamp(expires, 0)
    }

    /// Check that `url` was issued by this signer and is unexpired at `now`.
    pub fn verify(&self, url: &str, now: DateTime<Utc>) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(key) = super::key_from_url(url) else {
            return false;
        };
        let mut expires = None;
        let mut signature = None;
        for (name, value) in parsed.query_pairs() {
            match name.as_ref() {
                "expires" => expires = value.parse::<i64>().ok(),
                "signature" => signature = URL_SAFE_NO_PAD.decode(value.as_bytes()).ok(),
                _ => {}
            }
        }
        let (Some(expires), Some(signature)) = (expires, signature) else {
            return false;
        };
        if expires <= now.timestamp() {
            return false;
        }

        let expected = self.signature(&key, expires);
        expected.ct_eq(&signature).into()
    }
}

#[async_trait]
impl UrlSigner for HmacUrlSigner {
    async fn presign(&self, key: &str) -> Result<String, SignError> {
        self.presign_at(key, Utc::now())
    }
}
