use serde::{Deserialize, Serialize};

use crate::error::{PhotoCompError, Result};
use crate::utils::get_env_with_prefix;

/// Longest lifetime a signed logo URL may be issued for (7 days).
pub const MAX_URL_TTL_SECONDS: u64 = 604_800;

/// Main configuration for the PhotoComp access layer
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub logos: LogoConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Settings for issuing time-limited logo URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogoConfig {
    /// Origin the signed URLs point at, e.g. `https://photocomp-logos.s3.amazonaws.com`.
    #[serde(default = "default_logo_base_url")]
    pub base_url: String,
    /// HMAC key used to sign URLs. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub signing_secret: String,
    #[serde(default = "default_url_ttl_seconds")]
    pub url_ttl_seconds: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            base_url: default_logo_base_url(),
            signing_secret: String::new(),
            url_ttl_seconds: default_url_ttl_seconds(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_logo_base_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_url_ttl_seconds() -> u64 {
    3600
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_logo_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.logos.base_url = base_url.into();
        self
    }

    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.logos.signing_secret = secret.into();
        self
    }

    pub fn with_url_ttl_seconds(mut self, seconds: u64) -> Self {
        self.config.logos.url_ttl_seconds = seconds;
        self
    }

    /// Load configuration from environment variables with PHOTOCOMP_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(base_url) = get_env_with_prefix("LOGO_BASE_URL") {
            self.config.logos.base_url = base_url;
        }
        if let Some(secret) = get_env_with_prefix("LOGO_SIGNING_SECRET") {
            self.config.logos.signing_secret = secret;
        }
        if let Some(ttl) = get_env_with_prefix("LOGO_URL_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse() {
                self.config.logos.url_ttl_seconds = seconds;
            }
        }
        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if:
    /// - the log level is unknown
    /// - the logo base URL does not parse
    /// - the signing secret is empty
    /// - the URL TTL is zero or longer than seven days
    pub fn build(self) -> Result<Config> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(PhotoCompError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        url::Url::parse(&self.config.logos.base_url).map_err(|e| {
            PhotoCompError::bad_request(format!(
                "Invalid logo base URL {} - {}",
                self.config.logos.base_url, e
            ))
        })?;

        if self.config.logos.signing_secret.is_empty() {
            return Err(PhotoCompError::bad_request(
                "Logo signing secret must not be empty",
            ));
        }

        let ttl = self.config.logos.url_ttl_seconds;
        if ttl == 0 || ttl > MAX_URL_TTL_SECONDS {
            return Err(PhotoCompError::bad_request(format!(
                "Logo URL TTL must be between 1 and {} seconds, got {}",
                MAX_URL_TTL_SECONDS, ttl
            )));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ConfigBuilder {
        ConfigBuilder::new().with_signing_secret("test-secret")
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.logos.url_ttl_seconds, 3600);
    }

    #[test]
    fn test_build_valid() {
        let config = valid()
            .with_log_level("debug")
            .with_logo_base_url("https://logos.example.com")
            .with_url_ttl_seconds(900)
            .build()
            .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logos.base_url, "https://logos.example.com");
        assert_eq!(config.logos.url_ttl_seconds, 900);
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let err = valid().with_log_level("loud").build().unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_rejects_empty_secret() {
        let err = ConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, PhotoCompError::BadRequest(_)));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(valid().with_logo_base_url("not a url").build().is_err());
    }

    #[test]
    fn test_rejects_ttl_out_of_range() {
        assert!(valid().with_url_ttl_seconds(0).build().is_err());
        assert!(valid().with_url_ttl_seconds(MAX_URL_TTL_SECONDS + 1).build().is_err());
        assert!(valid().with_url_ttl_seconds(MAX_URL_TTL_SECONDS).build().is_ok());
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("PHOTOCOMP_LOGO_SIGNING_SECRET", "from-env");
            std::env::set_var("PHOTOCOMP_LOGO_URL_TTL_SECONDS", "120");
        }
        let config = ConfigBuilder::new().from_env().build().unwrap();
        unsafe {
            std::env::remove_var("PHOTOCOMP_LOGO_SIGNING_SECRET");
            std::env::remove_var("PHOTOCOMP_LOGO_URL_TTL_SECONDS");
        }

        assert_eq!(config.logos.signing_secret, "from-env");
        assert_eq!(config.logos.url_ttl_seconds, 120);
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let config = valid().build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("test-secret"));
    }
}
