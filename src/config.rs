//! Configuration management for the Autotask client.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present.

use std::env;
use std::fmt;

use crate::error::AutotaskError;

/// Default client-side request budget.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Path suffix every zone base URL must end with.
const API_PATH: &str = "/atservicesrest/v1.0/";

/// Configuration for connecting to Autotask.
///
/// The secret is stored but never logged; the `Debug` output redacts it.
#[derive(Clone)]
pub struct Config {
    /// API user name (also used for zone discovery).
    pub username: String,

    /// API user secret.
    /// This value must never be logged or included in error messages.
    secret: String,

    /// Tracking identifier sent as `ApiIntegrationCode`.
    pub integration_code: String,

    /// Explicit zone base URL (e.g. `https://webservices5.autotask.net/atservicesrest/v1.0/`).
    /// When absent the zone is discovered from the user name.
    pub base_url: Option<String>,

    /// Maximum number of requests issued per minute.
    pub requests_per_minute: u32,
}

impl Config {
    /// Creates a configuration from explicit credentials.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::Config` if a credential is empty or the
    /// secret looks like a placeholder.
    pub fn new(
        username: impl Into<String>,
        secret: impl Into<String>,
        integration_code: impl Into<String>,
    ) -> Result<Self, AutotaskError> {
        let config = Config {
            username: username.into().trim().to_string(),
            secret: secret.into(),
            integration_code: integration_code.into().trim().to_string(),
            base_url: None,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        };

        for (name, value) in [
            ("username", &config.username),
            ("secret", &config.secret),
            ("integration code", &config.integration_code),
        ] {
            if value.trim().is_empty() {
                return Err(AutotaskError::invalid_config(format!("{} must not be empty", name)));
            }
        }
        Self::validate_secret(&config.secret)?;

        Ok(config)
    }

    /// Uses a fixed zone base URL instead of zone discovery.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::Config` if the URL is not http(s).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, AutotaskError> {
        self.base_url = Some(Self::normalize_base_url(&base_url.into())?);
        Ok(self)
    }

    /// Sets the client-side request budget; zero disables spacing.
    pub fn with_requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `AUTOTASK_USERNAME`: API user name
    /// - `AUTOTASK_SECRET`: API user secret
    /// - `AUTOTASK_INTEGRATION_CODE`: API tracking identifier
    ///
    /// # Optional Environment Variables
    ///
    /// - `AUTOTASK_BASE_URL`: zone base URL, skips zone discovery
    /// - `AUTOTASK_REQUESTS_PER_MINUTE`: request budget (default 60)
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::Config` if any required variable is missing
    /// or if values fail validation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// dotenvy::dotenv().ok();
    /// let config = Config::from_env()?;
    /// ```
    pub fn from_env() -> Result<Self, AutotaskError> {
        let username = Self::get_required_env("AUTOTASK_USERNAME")?;
        let secret = Self::get_required_env("AUTOTASK_SECRET")?;
        let integration_code = Self::get_required_env("AUTOTASK_INTEGRATION_CODE")?;

        let mut config = Self::new(username, secret, integration_code)?;

        if let Some(base_url) = Self::get_optional_env("AUTOTASK_BASE_URL") {
            config = config.with_base_url(base_url)?;
        }

        if let Some(rpm) = Self::get_optional_env("AUTOTASK_REQUESTS_PER_MINUTE") {
            let rpm = rpm.trim().parse::<u32>().map_err(|_| {
                AutotaskError::invalid_config(
                    "AUTOTASK_REQUESTS_PER_MINUTE must be a non-negative integer",
                )
            })?;
            config = config.with_requests_per_minute(rpm);
        }

        Ok(config)
    }

    /// Returns the API secret for request headers.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, AutotaskError> {
        env::var(name)
            .map_err(|_| AutotaskError::missing_env(name))
            .and_then(|value| {
                if value.trim().is_empty() {
                    Err(AutotaskError::missing_env(name))
                } else {
                    Ok(value)
                }
            })
    }

    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.trim().is_empty())
    }

    /// Validates a zone base URL and makes it end with `/atservicesrest/v1.0/`.
    pub(crate) fn normalize_base_url(url: &str) -> Result<String, AutotaskError> {
        let url = url.trim();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AutotaskError::invalid_config(
                "AUTOTASK_BASE_URL must start with http:// or https://",
            ));
        }

        let url = url.trim_end_matches('/');
        let lower = url.to_ascii_lowercase();
        let root = ["/atservicesrest/v1.0", "/atservicesrest"]
            .iter()
            .find(|suffix| lower.ends_with(*suffix))
            .map_or(url, |suffix| &url[..url.len() - suffix.len()]);

        Ok(format!("{}{}", root, API_PATH))
    }

    /// Validates the secret is not a placeholder value.
    fn validate_secret(secret: &str) -> Result<(), AutotaskError> {
        let secret_lower = secret.to_lowercase();
        let placeholder_patterns = ["your_secret", "your-secret", "placeholder", "changeme", "xxx"];

        for pattern in placeholder_patterns {
            if secret_lower.contains(pattern) {
                return Err(AutotaskError::invalid_config(
                    "AUTOTASK_SECRET appears to be a placeholder value",
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .field("integration_code", &self.integration_code)
            .field("base_url", &self.base_url)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests avoid touching process environment variables so they can run in parallel.

    #[test]
    fn test_normalize_base_url_appends_api_path() {
        let result = Config::normalize_base_url("https://webservices5.autotask.net").unwrap();
        assert_eq!(result, "https://webservices5.autotask.net/atservicesrest/v1.0/");
    }

    #[test]
    fn test_normalize_base_url_accepts_full_path() {
        let result =
            Config::normalize_base_url("https://webservices5.autotask.net/ATServicesRest/v1.0/")
                .unwrap();
        assert_eq!(result, "https://webservices5.autotask.net/atservicesrest/v1.0/");
    }

    #[test]
    fn test_normalize_base_url_adds_version() {
        let result =
            Config::normalize_base_url("http://localhost:8080/atservicesrest").unwrap();
        assert_eq!(result, "http://localhost:8080/atservicesrest/v1.0/");
    }

    #[test]
    fn test_normalize_base_url_requires_scheme() {
        assert!(Config::normalize_base_url("webservices5.autotask.net").is_err());
    }

    #[test]
    fn test_new_rejects_empty_values() {
        assert!(Config::new("", "abc123", "CODE").is_err());
        assert!(Config::new("api@example.com", "abc123", "  ").is_err());
    }

    #[test]
    fn test_new_rejects_placeholder_secret() {
        let err = Config::new("api@example.com", "your_secret_here", "CODE").unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("api@example.com", "abc123def456", "CODE").unwrap();
        assert_eq!(config.base_url, None);
        assert_eq!(config.requests_per_minute, DEFAULT_REQUESTS_PER_MINUTE);
        assert_eq!(config.secret(), "abc123def456");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::new("api@example.com", "abc123def456", "CODE").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("abc123def456"));
        assert!(debug.contains("[REDACTED]"));
    }
}
