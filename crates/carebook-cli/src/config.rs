//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/carebook/config.toml` by default.
//!
//! The API token supports secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use carebook_api::{ApiConfig, DEFAULT_TIMEOUT};
use carebook_core::LogFormat;
use carebook_session::{DEFAULT_CACHE_TTL, SessionConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the carebook client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Log line layout: `compact`, `pretty` or `json`.
    pub log_format: Option<String>,

    /// Scheduling API settings.
    pub api: ApiSettings,

    /// Booking defaults.
    pub booking: BookingSettings,
}

/// Scheduling API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL, e.g. `https://api.example.com/v1`.
    pub base_url: Option<String>,

    /// Bearer token (supports `pass::` and `env::` prefixes).
    pub token: Option<String>,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Booking defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    /// Callback number used for phone appointments when `--phone` is not given.
    pub phone: Option<String>,

    /// Seconds fetched availability stays fresh.
    pub cache_ttl: u64,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            phone: None,
            cache_ttl: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

/// Values from the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub token: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("carebook")
    }

    /// Parses `log_format`, defaulting to compact output.
    pub fn log_format(&self) -> Result<LogFormat, String> {
        match self.log_format.as_deref().map(str::trim) {
            None | Some("") | Some("compact") => Ok(LogFormat::Compact),
            Some("pretty") => Ok(LogFormat::Pretty),
            Some("json") => Ok(LogFormat::Json),
            Some(other) => Err(format!(
                "unknown log_format '{}', expected compact, pretty or json",
                other
            )),
        }
    }

    /// Builds the HTTP client configuration.
    ///
    /// Command-line values win over the file. The token is passed through
    /// `secret::resolve()` to expand `pass::` and `env::` references.
    pub fn to_api_config(&self, overrides: &Overrides) -> Result<ApiConfig, String> {
        let base_url = overrides
            .api_url
            .as_deref()
            .or(self.api.base_url.as_deref())
            .ok_or_else(|| {
                format!(
                    "API base URL not set. Add to {}:\n  \
                     [api]\n  \
                     base_url = \"https://api.example.com/v1\"\n\n  \
                     Or pass --api-url / set CAREBOOK_API_URL",
                    Self::default_path().display()
                )
            })?;

        if self.api.timeout == 0 {
            return Err("api.timeout must be greater than zero".to_string());
        }

        let mut config =
            ApiConfig::new(base_url).with_timeout(Duration::from_secs(self.api.timeout));

        if let Some(raw) = overrides.token.as_deref().or(self.api.token.as_deref()) {
            let token = crate::secret::resolve(raw)
                .map_err(|e| format!("failed to resolve api token: {}", e))?;
            config = config.with_token(token);
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    /// Builds the booking session configuration.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::new().with_cache_ttl(Duration::from_secs(self.booking.cache_ttl))
    }
}
