//! Configuration commands.

use std::path::Path;

use crate::config::{ClientConfig, Overrides};
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout. The token is never printed.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let mut shown = config.clone();
    if shown.api.token.is_some() {
        shown.api.token = Some("<redacted>".to_string());
    }
    let toml_str = toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration, resolving the token reference if any.
pub fn validate(config: &ClientConfig, overrides: &Overrides) -> ClientResult<()> {
    config.log_format().map_err(ClientError::Config)?;
    if config.booking.cache_ttl == 0 {
        return Err(ClientError::Config(
            "booking.cache_ttl must be greater than zero".to_string(),
        ));
    }

    let api = config
        .to_api_config(overrides)
        .map_err(|e| ClientError::Config(format!("invalid API settings: {}", e)))?;
    println!("API: {}", api.base_url);
    if api.token.is_some() {
        println!("API token resolved.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
