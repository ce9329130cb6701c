//! Environment-driven settings for ingestion.

use std::env;

use thiserror::Error;

use crate::adapters::alphavantage::DEFAULT_ENDPOINT;

pub const API_KEY_ENV: &str = "PRICESYNC_ALPHAVANTAGE_API_KEY";
pub const ENDPOINT_ENV: &str = "PRICESYNC_ALPHAVANTAGE_ENDPOINT";
pub const DEFAULT_API_KEY: &str = "demo";
pub const DEFAULT_LATEST_N_DAYS: usize = 14;
pub const DEFAULT_SYMBOLS: &str = "IBM,AAPL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must not be blank")]
    Blank { name: &'static str },
    #[error("{name} must be an http(s) URL: '{value}'")]
    InvalidUrl { name: &'static str, value: String },
}

/// Provider credentials and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub api_key: String,
    pub endpoint: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_key: String::from(DEFAULT_API_KEY),
            endpoint: String::from(DEFAULT_ENDPOINT),
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Unset variables take their defaults; set ones must be usable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(api_key) = lookup(API_KEY_ENV) {
            if api_key.trim().is_empty() {
                return Err(ConfigError::Blank { name: API_KEY_ENV });
            }
            config.api_key = api_key.trim().to_owned();
        }

        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            let endpoint = endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    name: ENDPOINT_ENV,
                    value: endpoint.to_owned(),
                });
            }
            config.endpoint = endpoint.to_owned();
        }

        Ok(config)
    }
}
