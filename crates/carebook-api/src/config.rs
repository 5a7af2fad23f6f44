//! HTTP client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ApiError, ApiResult};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`crate::HttpSchedulingApi`].
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL of the scheduling API, e.g. `https://api.example.com/v1`.
    pub base_url: String,

    /// Bearer token for the signed-in patient.
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builder: set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builder: set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the configuration and returns the parsed base URL.
    ///
    /// The returned URL always ends with `/` so endpoint paths join under it
    /// instead of replacing its last segment.
    pub fn validate(&self) -> ApiResult<Url> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ApiError::configuration("API base URL is not set"));
        }

        let mut url = Url::parse(trimmed).map_err(|e| {
            ApiError::configuration(format!("invalid API base URL '{}': {}", trimmed, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::configuration(format!(
                "API base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::configuration("timeout must be greater than zero"));
        }

        if let Some(token) = &self.token
            && token.trim().is_empty()
        {
            return Err(ApiError::configuration("API token is empty"));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        Ok(url)
    }
}
