/// Get environment variable with PHOTOCOMP_ prefix, falling back to unprefixed version
///
/// Checks `PHOTOCOMP_{key}` first, then `{key}`.
///
/// ```rust
/// use photocomp::utils::get_env_with_prefix;
///
/// // Checks PHOTOCOMP_LOGO_BASE_URL first, then LOGO_BASE_URL
/// let base_url = get_env_with_prefix("LOGO_BASE_URL");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("PHOTOCOMP_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("PHOTOCOMP_ENV_TEST_VAR", "prefixed_value");
        }
        assert_eq!(get_env_with_prefix("ENV_TEST_VAR"), Some("prefixed_value".to_string()));
        unsafe {
            std::env::remove_var("PHOTOCOMP_ENV_TEST_VAR");
        }

        unsafe {
            std::env::set_var("ENV_FALLBACK_VAR", "unprefixed_value");
        }
        assert_eq!(get_env_with_prefix("ENV_FALLBACK_VAR"), Some("unprefixed_value".to_string()));
        unsafe {
            std::env::remove_var("ENV_FALLBACK_VAR");
        }

        assert_eq!(get_env_with_prefix("ENV_NON_EXISTENT_VAR"), None);
    }
}
