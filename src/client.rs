//! HTTP client for the Autotask REST API.
//!
//! This module provides `AutotaskClient`, the reqwest-backed
//! [`Transport`] used by the pagination engine and the entity facade.
//!
//! # Zones
//!
//! Autotask tenants live in regional zones. Unless a base URL is configured,
//! the client asks the zone discovery endpoint for the user's zone on the
//! first request and caches the result for the life of the client.
//!
//! # Security
//!
//! The API secret is never logged. Error messages built from response
//! bodies are sanitized and truncated before they are returned.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use tokio::sync::OnceCell;
use url::Url;

use crate::config::Config;
use crate::entity::EntityService;
use crate::error::AutotaskError;
use crate::models::{ApiErrorResponse, ZoneInfo};
use crate::rate_limiter::RateLimiter;
use crate::transport::Transport;

/// Zone discovery endpoint shared by all tenants.
pub const ZONE_INFORMATION_URL: &str =
    "https://webservices.autotask.net/atservicesrest/v1.0/ZoneInformation";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("autotask-rs/", env!("CARGO_PKG_VERSION"));

/// Maximum length for HTTP error response bodies kept in errors.
const MAX_ERROR_BODY_LEN: usize = 500;

/// HTTP client for the Autotask REST API.
///
/// Cloning is cheap; clones share the connection pool, the cached zone and
/// the rate limiter.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = AutotaskClient::new(&config)?;
///
/// let mut tickets = client
///     .tickets()
///     .iter::<serde_json::Value>("Status!=5", 50)
///     .await?;
/// while tickets.advance().await {
///     println!("{}", tickets.item().unwrap());
/// }
/// ```
#[derive(Clone)]
pub struct AutotaskClient {
    /// The underlying HTTP client.
    http: Client,

    username: String,

    /// SECURITY: Never log this value!
    secret: String,

    integration_code: String,

    /// Zone base URL, resolved on first use unless configured.
    base_url: Arc<OnceCell<Url>>,

    zone_lookup_url: String,

    rate_limiter: RateLimiter,
}

impl AutotaskClient {
    /// Creates a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::HttpClient` if the HTTP client fails to
    /// initialize, or `AutotaskError::Config` if the configured base URL
    /// does not parse.
    pub fn new(config: &Config) -> Result<Self, AutotaskError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(AutotaskError::HttpClient)?;

        let base_url = config
            .base_url
            .as_deref()
            .map(Self::parse_base_url)
            .transpose()?;

        Ok(Self {
            http,
            username: config.username.clone(),
            secret: config.secret().to_string(),
            integration_code: config.integration_code.clone(),
            base_url: Arc::new(OnceCell::new_with(base_url)),
            zone_lookup_url: ZONE_INFORMATION_URL.to_string(),
            rate_limiter: RateLimiter::new(config.requests_per_minute),
        })
    }

    /// Points zone discovery at a different endpoint.
    pub fn with_zone_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.zone_lookup_url = url.into();
        self
    }

    /// Replaces the request spacing policy.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Returns an entity-bound facade, e.g. `client.entity("Tickets")`.
    pub fn entity(&self, name: impl Into<String>) -> EntityService<'_, Self> {
        EntityService::new(self, name)
    }

    /// Facade for `Companies`.
    pub fn companies(&self) -> EntityService<'_, Self> {
        self.entity("Companies")
    }

    /// Facade for `Tickets`.
    pub fn tickets(&self) -> EntityService<'_, Self> {
        self.entity("Tickets")
    }

    /// Facade for `Contacts`.
    pub fn contacts(&self) -> EntityService<'_, Self> {
        self.entity("Contacts")
    }

    /// Facade for `Resources`.
    pub fn resources(&self) -> EntityService<'_, Self> {
        self.entity("Resources")
    }

    /// Facade for `Projects`.
    pub fn projects(&self) -> EntityService<'_, Self> {
        self.entity("Projects")
    }

    /// Facade for `Tasks`.
    pub fn tasks(&self) -> EntityService<'_, Self> {
        self.entity("Tasks")
    }

    /// Facade for `TimeEntries`.
    pub fn time_entries(&self) -> EntityService<'_, Self> {
        self.entity("TimeEntries")
    }

    /// Facade for `Contracts`.
    pub fn contracts(&self) -> EntityService<'_, Self> {
        self.entity("Contracts")
    }

    /// Facade for `ConfigurationItems`.
    pub fn configuration_items(&self) -> EntityService<'_, Self> {
        self.entity("ConfigurationItems")
    }

    /// Looks up the zone serving this client's user.
    ///
    /// # Errors
    ///
    /// Returns the transport or status error of the lookup request, or
    /// `AutotaskError::Serialization` if the body is not zone information.
    pub async fn zone_info(&self) -> Result<ZoneInfo, AutotaskError> {
        let mut url = Url::parse(&self.zone_lookup_url)
            .map_err(|e| AutotaskError::invalid_config(format!("invalid zone lookup URL: {}", e)))?;
        url.query_pairs_mut().append_pair("user", &self.username);

        tracing::debug!(url = %url, "Requesting zone information");

        let body = self.send(Method::GET, url, None).await?;
        let zone: ZoneInfo = serde_json::from_value(body)?;

        tracing::debug!(zone = ?zone.zone_name, url = %zone.url, "Zone resolved");
        Ok(zone)
    }

    /// Returns the zone base URL, discovering it on first use.
    ///
    /// # Errors
    ///
    /// Returns the zone lookup failure if discovery is needed and fails.
    pub async fn base_url(&self) -> Result<&Url, AutotaskError> {
        self.base_url
            .get_or_try_init(|| async {
                let zone = self.zone_info().await?;
                let base = Config::normalize_base_url(&zone.url)?;
                Self::parse_base_url(&base)
            })
            .await
    }

    fn parse_base_url(base_url: &str) -> Result<Url, AutotaskError> {
        Url::parse(base_url)
            .map_err(|e| AutotaskError::invalid_config(format!("invalid base URL: {}", e)))
    }

    /// Resolves a request target against the base URL.
    ///
    /// Relative targets are joined onto the base path. Absolute cursor URLs
    /// are kept verbatim but must stay on the base URL's host and port.
    fn resolve_target(base: &Url, target: &str) -> Result<Url, AutotaskError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(AutotaskError::validation("request target must not be empty"));
        }

        match Url::parse(target) {
            Ok(url) => {
                if url.scheme() != base.scheme()
                    || url.host_str() != base.host_str()
                    || url.port_or_known_default() != base.port_or_known_default()
                {
                    return Err(AutotaskError::invalid_cursor(format!(
                        "cursor host mismatch: expected {:?}, got {:?}",
                        base.host_str(),
                        url.host_str()
                    )));
                }
                Ok(url)
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => base
                .join(target.trim_start_matches('/'))
                .map_err(|e| AutotaskError::validation(format!("invalid request target: {}", e))),
            Err(e) => Err(AutotaskError::invalid_cursor(e.to_string())),
        }
    }

    /// Sends one authenticated request and decodes the JSON body.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, AutotaskError> {
        self.rate_limiter.acquire().await;

        tracing::debug!(
            method = %method,
            path = %url.path(),
            "Making Autotask API request"
        );

        let operation = format!("{} {}", method, url.path());

        let mut req = self
            .http
            .request(method, url.clone())
            .header("UserName", &self.username)
            .header("Secret", &self.secret)
            .header("ApiIntegrationCode", &self.integration_code)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                return AutotaskError::timeout(
                    Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                    operation.clone(),
                );
            }
            AutotaskError::Http(e.without_url())
        })?;
        let status = response.status();

        tracing::debug!(status = status.as_u16(), "Autotask API response");

        if !status.is_success() {
            return Err(self.handle_http_error(status, &url, response).await);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::Value::Null);
        }

        let text = response.text().await.map_err(AutotaskError::Http)?;

        tracing::trace!(body = %text, "Autotask API response body");

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Converts a non-success response into an `AutotaskError`.
    async fn handle_http_error(
        &self,
        status: StatusCode,
        url: &Url,
        response: reqwest::Response,
    ) -> AutotaskError {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AutotaskError::Authentication,
            StatusCode::NOT_FOUND => AutotaskError::not_found(url.path()),
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!(retry_after = ?retry_after, "Rate limited by Autotask");
                AutotaskError::RateLimited { retry_after }
            }
            _ => {
                if status.is_server_error() {
                    tracing::warn!(status = %status, "Autotask server error");
                }

                match serde_json::from_str::<ApiErrorResponse>(&body) {
                    Ok(api_error) if api_error.has_content() => AutotaskError::Api {
                        status,
                        message: self.clean_message(&api_error.primary_message()),
                        errors: api_error
                            .errors
                            .iter()
                            .map(|e| self.clean_message(e))
                            .collect(),
                    },
                    _ => AutotaskError::HttpStatus {
                        status,
                        body: self.clean_message(&body),
                    },
                }
            }
        }
    }

    /// Redacts the secret and truncates text taken from a response.
    fn clean_message(&self, message: &str) -> String {
        let message = AutotaskError::sanitize_message(message, &self.secret);
        if message.chars().count() > MAX_ERROR_BODY_LEN {
            let truncated: String = message.chars().take(MAX_ERROR_BODY_LEN).collect();
            format!("{}...[truncated]", truncated)
        } else {
            message
        }
    }
}

impl Transport for AutotaskClient {
    async fn submit(
        &self,
        method: Method,
        target: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, AutotaskError> {
        let base = self.base_url().await?;
        let url = Self::resolve_target(base, target)?;
        self.send(method, url, body).await
    }
}

impl fmt::Debug for AutotaskClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutotaskClient")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .field("integration_code", &self.integration_code)
            .field("base_url", &self.base_url.get().map(Url::as_str))
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}
