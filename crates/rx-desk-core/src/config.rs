//! Client runtime configuration.
//!
//! Resolved once at startup and passed into the client and workflows, so
//! nothing reads environment variables while a request is being handled.

use thiserror::Error;

use crate::deriver::DEFAULT_PATIENT_ID_PREFIX;
use crate::history::DEFAULT_HISTORY_YEARS;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "RX_DESK_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "RX_DESK_TIMEOUT_SECS";
pub const ENV_PATIENT_ID_PREFIX: &str = "RX_DESK_PATIENT_ID_PREFIX";
pub const ENV_HISTORY_YEARS: &str = "RX_DESK_HISTORY_YEARS";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Backend and workflow settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Prefix for generated patient ids
    pub patient_id_prefix: String,
    /// Threshold for the "older than N years" history filter
    pub history_years: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            patient_id_prefix: DEFAULT_PATIENT_ID_PREFIX.to_string(),
            history_years: DEFAULT_HISTORY_YEARS,
        }
    }
}

impl ClientConfig {
    /// Defaults pointed at a specific backend.
    pub fn for_base_url(base_url: &str) -> ConfigResult<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.base_url = normalize_base_url(&url)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = parse_positive(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(prefix) = lookup(ENV_PATIENT_ID_PREFIX) {
            let prefix = prefix.trim();
            if prefix.is_empty() {
                return Err(ConfigError::Empty(ENV_PATIENT_ID_PREFIX));
            }
            config.patient_id_prefix = prefix.to_string();
        }
        if let Some(raw) = lookup(ENV_HISTORY_YEARS) {
            config.history_years = parse_positive(ENV_HISTORY_YEARS, &raw)?;
        }

        Ok(config)
    }
}

fn normalize_base_url(raw: &str) -> ConfigResult<String> {
    let url = raw.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(ConfigError::Empty(ENV_API_URL));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key: ENV_API_URL,
            value: raw.to_string(),
        });
    }
    Ok(url.to_string())
}

fn parse_positive<T>(key: &'static str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}
