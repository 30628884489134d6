//! Server configuration.
//!
//! Sources, later ones win:
//! 1. Built-in defaults
//! 2. `rental.toml` (or the file named by `RENTAL_CONFIG`), if it exists
//! 3. `RENTAL_*` environment variables (`RENTAL_HTTP_PORT`, `RENTAL_BIND_ADDR`,
//!    `RENTAL_DATABASE_PATH`, `RENTAL_MAX_CONNECTIONS`)

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rental.toml";

/// Rental API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalConfig {
    /// Interface to listen on
    pub bind_addr: String,

    /// HTTP port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,
}

impl RentalConfig {
    /// Load configuration from the default sources.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("RENTAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(Path::new(&path), Environment::with_prefix("RENTAL"))
    }

    /// Load configuration from an explicit file and environment source.
    pub fn from_sources(file: &Path, env: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("bind_addr", "0.0.0.0")?
            .set_default("http_port", 8080)?
            .set_default("database_path", "./rental.db")?
            .set_default("max_connections", 5)?
            .add_source(File::new(&file.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(env.try_parsing(true))
            .build()?;

        let config: RentalConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidValue("bind_addr".to_string()));
        }
        if self.http_port == 0 {
            return Err(ConfigError::InvalidValue("http_port".to_string()));
        }
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        Ok(())
    }

    /// Address the HTTP listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue("bind_addr".to_string()))?;
        Ok(SocketAddr::new(ip, self.http_port))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
