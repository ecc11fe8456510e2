//! Configuration and credential loading

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

use super::types::{AppConfig, ExchangeCredentials, FeedCredentials};
use crate::common::errors::{ClientError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP__, e.g. APP__TRADING__NOTIONAL)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    load_config_with_overrides(config_path, &[])
}

/// Same as [`load_config`], with explicit key/value pairs layered on top
///
/// Keys use dotted paths such as `trading.ticker`. Used for command-line
/// flags, which win over both the file and the environment.
pub fn load_config_with_overrides(
    config_path: Option<&str>,
    overrides: &[(&str, String)],
) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            debug!("Reading configuration file {}", path);
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    for (key, value) in overrides {
        builder = builder
            .set_override(*key, value.clone())
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
    }

    let config = builder
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    app_config
        .trading
        .validate()
        .map_err(ClientError::Configuration)?;

    Ok(app_config)
}

/// Read a JSON key file into a credentials type
fn load_json_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ClientError::Credentials(format!("Cannot read {}: {}", path, e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| ClientError::Credentials(format!("Invalid key file {}: {}", path, e)))
}

/// Load exchange API keys from a JSON file
///
/// Expected keys: `binance_api_key`, `binance_api_secret_key`.
pub fn load_exchange_credentials(path: &str) -> Result<ExchangeCredentials> {
    load_json_file(path)
}

/// Load feed API keys from a JSON file
///
/// Expected keys: `twitter_api_key`, `twitter_api_secret_key`, and
/// optionally `access_token`, `access_secret_token`.
pub fn load_feed_credentials(path: &str) -> Result<FeedCredentials> {
    load_json_file(path)
}
