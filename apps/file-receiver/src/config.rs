//! Configuration management for the file receiver

use std::env;
use std::path::PathBuf;

/// Port the receiver listens on when `SERVER_PORT` is unset.
pub const DEFAULT_PORT: u16 = 8760;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ip_address: String,
    pub port: u16,
}

/// Destination directories for persisted uploads
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub image_dir: PathBuf,
    pub video_dir: PathBuf,
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
                ip_address: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            storage: StorageConfig {
                image_dir: PathBuf::from("./uploads/images"),
                video_dir: PathBuf::from("./uploads/videos"),
            },
        }
    }
}

impl Config {
    /// Build the configuration from `SERVER_IP_ADDRESS`, `SERVER_PORT`,
    /// `SAVE_IMAGE_DIR` and `SAVE_VIDEO_DIR`.
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
            storage: StorageConfig {
                image_dir: lookup("SAVE_IMAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.image_dir),
                video_dir: lookup("SAVE_VIDEO_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.video_dir),
            },
        })
    }

    /// Address the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.ip_address, self.server.port)
    }
}
