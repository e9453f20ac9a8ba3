//! Configuration management for the file uploader

use std::env;

/// Receiver port used when `SERVER_PORT` is unset.
pub const DEFAULT_PORT: u16 = 8760;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
}

/// Where the receiver is listening
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ip_address: String,
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid SERVER_PORT {value:?}: {source}")]
    InvalidPort {
        value: String,
        source: std::num::ParseIntError,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                ip_address: "127.0.0.1".to_string(),
                port: DEFAULT_PORT,
            },
        }
    }
}

impl Config {
    /// Build the configuration from `SERVER_IP_ADDRESS` and `SERVER_PORT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = match lookup("SERVER_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => defaults.server.port,
        };

        Ok(Config {
            server: ServerConfig {
                ip_address: lookup("SERVER_IP_ADDRESS").unwrap_or(defaults.server.ip_address),
                port,
            },
        })
    }

    /// Base URL of the receiver, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server.ip_address, self.server.port)
    }
}
