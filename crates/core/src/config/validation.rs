//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `page_size` is 0 or exceeds the server cap of 500
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_retries` exceeds 10
    /// - `cache_ttl_seconds` is 0 while caching is enabled
    /// - `user_agent` is empty
    /// - a site has an empty name or url, or two sites share a name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid { field: "page_size".into(), reason: "must be greater than 0".into() });
        }
        if self.page_size > 500 {
            return Err(ConfigError::Invalid { field: "page_size".into(), reason: "must not exceed 500".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_retries > 10 {
            return Err(ConfigError::Invalid { field: "max_retries".into(), reason: "must not exceed 10".into() });
        }

        if self.cache_enabled && self.cache_ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_seconds".into(),
                reason: "must be greater than 0 when caching is enabled".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.name.trim().is_empty() || site.url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "sites".into(),
                    reason: "every site needs a name and a url".into(),
                });
            }
            if !seen.insert(site.name.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "sites".into(),
                    reason: format!("duplicate site name: {}", site.name),
                });
            }
        }

        if self.request_interval_ms > 10_000 {
            tracing::warn!(
                request_interval_ms = self.request_interval_ms,
                "request_interval_ms above 10s; bulk operations over large sites will take hours"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteEntry;

    fn site(name: &str, url: &str) -> SiteEntry {
        SiteEntry { name: name.into(), url: url.into() }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_page_size_zero() {
        let config = AppConfig { page_size: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_size"));
    }

    #[test]
    fn test_validate_page_size_exceeds_limit() {
        let config = AppConfig { page_size: 501, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_size"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_max_retries() {
        let config = AppConfig { max_retries: 11, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_retries"));
    }

    #[test]
    fn test_validate_zero_ttl_only_matters_with_cache() {
        let config = AppConfig { cache_ttl_seconds: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { cache_ttl_seconds: 0, cache_enabled: false, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_sites() {
        let config = AppConfig { sites: vec![site("a", "https://a.example"), site("a", "https://b.example")], ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "sites"));

        let config = AppConfig { sites: vec![site("a", " ")], ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { sites: vec![site("a", "https://a.example")], ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { page_size: 500, timeout_ms: 100, max_retries: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
