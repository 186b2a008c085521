//! Configuration management for the RAX file store
//!
//! Values come from built-in defaults, an optional `config.toml` and
//! `RAX_FS_*` environment overrides, in that order of precedence.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an alternate configuration file
pub const CONFIG_PATH_ENV: &str = "RAX_FS_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config";
const MIN_HEADER_BYTES: usize = 256;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address the HTTP listener binds to
    pub bind_address: String,

    /// Listener port, 0 picks an ephemeral port
    pub port: u16,

    /// Root directory every stored entity lives beneath
    pub server_root: String,

    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,

    /// Largest accepted request line plus header block in bytes
    pub max_header_bytes: usize,

    /// Largest accepted number of header fields
    pub max_headers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            server_root: "./files".to_string(),
            max_body_bytes: 1_000_000,
            max_header_bytes: 8192,
            max_headers: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from defaults, `config.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("server_root", defaults.server_root)?
            .set_default("max_body_bytes", defaults.max_body_bytes as i64)?
            .set_default("max_header_bytes", defaults.max_header_bytes as i64)?
            .set_default("max_headers", defaults.max_headers as i64)?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("RAX_FS").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_root.trim().is_empty() {
            return Err(ConfigError::Message("server_root cannot be empty".into()));
        }

        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Message("bind_address cannot be empty".into()));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::Message(
                "max_body_bytes must be greater than 0".into(),
            ));
        }

        if self.max_header_bytes < MIN_HEADER_BYTES {
            return Err(ConfigError::Message(format!(
                "max_header_bytes must be at least {MIN_HEADER_BYTES}"
            )));
        }

        if self.max_headers == 0 {
            return Err(ConfigError::Message(
                "max_headers must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as a socket address string
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    /// Request framing limits derived from this configuration
    pub fn limits(&self) -> crate::protocol::RequestLimits {
        crate::protocol::RequestLimits {
            max_header_bytes: self.max_header_bytes,
            max_headers: self.max_headers,
            max_body_bytes: self.max_body_bytes,
        }
    }
}
