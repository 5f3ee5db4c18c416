//! Configuration module for Camix.

use serde::Deserialize;
use std::path::Path;

use crate::chat::validate_channel_name;
use crate::{CamixError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12345
}

fn default_max_connections() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

/// Chat service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Name of the protected channel every client lands in.
    #[serde(default = "default_channel")]
    pub default_channel: String,
    /// Nickname given to a client until it picks its own.
    #[serde(default = "default_nickname")]
    pub default_nickname: String,
    /// Maximum length of a chat line, in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

fn default_channel() -> String {
    "general".to_string()
}

fn default_nickname() -> String {
    "anonymous".to_string()
}

fn default_max_message_length() -> usize {
    500
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_channel: default_channel(),
            default_nickname: default_nickname(),
            max_message_length: default_max_message_length(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/camix.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(CamixError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CamixError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CAMIX_PORT`: listening port
    /// - `CAMIX_DEFAULT_CHANNEL`: name of the default channel
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("CAMIX_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CAMIX_PORT value: {}", port),
            }
        }
        if let Ok(channel) = std::env::var("CAMIX_DEFAULT_CHANNEL") {
            let channel = channel.trim();
            if !channel.is_empty() {
                self.chat.default_channel = channel.to_string();
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the default channel name is not a valid channel
    /// name, if no connection is allowed, or if messages cannot hold a
    /// single character.
    pub fn validate(&self) -> Result<()> {
        validate_channel_name(&self.chat.default_channel).map_err(|e| {
            CamixError::Config(format!("invalid default channel: {e}"))
        })?;

        if self.server.max_connections == 0 {
            return Err(CamixError::Config(
                "server.max_connections must be at least 1".to_string(),
            ));
        }

        if self.chat.max_message_length == 0 {
            return Err(CamixError::Config(
                "chat.max_message_length must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
