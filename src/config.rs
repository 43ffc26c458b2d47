//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `DIRECTORY_HOST` - Bind address (default: 127.0.0.1)
//! - `DIRECTORY_PORT` - Listen port (default: 8080)
//! - `DIRECTORY_DATA_DIR` - Directory for `accounts.json` and `settings.json`
//!   snapshots. Unset keeps everything in memory.
//! - `DIRECTORY_ALLOWED_ORIGINS` - Comma-separated origins allowed to call the
//!   service. Unset or empty allows any origin.
//! - `DIRECTORY_REQUEST_TIMEOUT_MS` - Deadline for each store round trip
//!   (default: 5000)
//! - `DIRECTORY_CHANNEL_CAPACITY` - Actor mailbox size (default: 100)
//! - `DIRECTORY_LOG_FORMAT` - `text` or `json` (default: text)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    pub channel_capacity: usize,
    pub log_format: LogFormat,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            data_dir: None,
            allowed_origins: Vec::new(),
            request_timeout: Duration::from_millis(5000),
            channel_capacity: 100,
            log_format: LogFormat::Text,
        }
    }
}

impl DirectoryConfig {
    /// Loads configuration from the process environment, reading a `.env`
    /// file first if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let host = parse_or("DIRECTORY_HOST", get("DIRECTORY_HOST"), defaults.host)?;
        let port = parse_or("DIRECTORY_PORT", get("DIRECTORY_PORT"), defaults.port)?;
        let timeout_ms: u64 = parse_or(
            "DIRECTORY_REQUEST_TIMEOUT_MS",
            get("DIRECTORY_REQUEST_TIMEOUT_MS"),
            defaults.request_timeout.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            return Err(invalid("DIRECTORY_REQUEST_TIMEOUT_MS", "must be greater than zero"));
        }
        let channel_capacity = parse_or(
            "DIRECTORY_CHANNEL_CAPACITY",
            get("DIRECTORY_CHANNEL_CAPACITY"),
            defaults.channel_capacity,
        )?;
        if channel_capacity == 0 {
            return Err(invalid("DIRECTORY_CHANNEL_CAPACITY", "must be greater than zero"));
        }
        let log_format = parse_or("DIRECTORY_LOG_FORMAT", get("DIRECTORY_LOG_FORMAT"), defaults.log_format)?;

        let allowed_origins = get("DIRECTORY_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().trim_end_matches('/').to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            data_dir: get("DIRECTORY_DATA_DIR").map(PathBuf::from),
            allowed_origins,
            request_timeout: Duration::from_millis(timeout_ms),
            channel_capacity,
            log_format,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(key, e.to_string())),
        None => Ok(default),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DirectoryConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        DirectoryConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.channel_capacity, 100);
        assert!(config.data_dir.is_none());
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DIRECTORY_HOST", "0.0.0.0"),
            ("DIRECTORY_PORT", "9000"),
            ("DIRECTORY_DATA_DIR", "/var/lib/directory"),
            ("DIRECTORY_ALLOWED_ORIGINS", "https://admin.example.com/, http://localhost:5173,,"),
            ("DIRECTORY_REQUEST_TIMEOUT_MS", "250"),
            ("DIRECTORY_LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/directory")));
        assert_eq!(
            config.allowed_origins,
            vec!["https://admin.example.com", "http://localhost:5173"]
        );
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("DIRECTORY_PORT", "eighty")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "DIRECTORY_PORT"
        ));
        assert!(matches!(
            load(&[("DIRECTORY_REQUEST_TIMEOUT_MS", "0")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "DIRECTORY_REQUEST_TIMEOUT_MS"
        ));
        assert!(matches!(
            load(&[("DIRECTORY_CHANNEL_CAPACITY", "0")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "DIRECTORY_CHANNEL_CAPACITY"
        ));
        assert!(load(&[("DIRECTORY_LOG_FORMAT", "xml")]).is_err());
    }
}
