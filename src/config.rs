//! Configuration module for chatrelay.

use serde::Deserialize;
use std::path::Path;

use crate::{RelayError, Result};

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
    /// Seconds a new connection has to complete the join handshake.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8005
}

fn default_max_connections() -> usize {
    100
}

fn default_handshake_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Capacity of each session's outbound delivery queue.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Number of delivered messages each room keeps in its in-memory log.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_outbound_queue() -> usize {
    64
}

fn default_history_capacity() -> usize {
    100
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbound_queue: default_outbound_queue(),
            history_capacity: default_history_capacity(),
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
    "logs/chatrelay.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Relay configuration.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RelayError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8005);
        assert_eq!(config.server.max_connections, 100);
        assert_eq!(config.server.handshake_timeout_secs, 30);
        assert_eq!(config.relay.outbound_queue, 64);
        assert_eq!(config.relay.history_capacity, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8005);
        assert_eq!(config.relay.outbound_queue, 64);
    }

    #[test]
    fn test_parse_partial() {
        let config = Config::parse(
            r#"
            [server]
            port = 9000

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        // Unspecified fields fall back to defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.relay.history_capacity, 100);
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8123
            max_connections = 5
            handshake_timeout_secs = 10

            [relay]
            outbound_queue = 16
            history_capacity = 50

            [logging]
            level = "warn"
            file = "logs/test.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.server.max_connections, 5);
        assert_eq!(config.server.handshake_timeout_secs, 10);
        assert_eq!(config.relay.outbound_queue, 16);
        assert_eq!(config.relay.history_capacity, 50);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.file, "logs/test.log");
    }

    #[test]
    fn test_parse_invalid() {
        let result = Config::parse("[server]\nport = \"not a number\"");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9999").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("does/not/exist.toml");
        assert!(matches!(result, Err(RelayError::Io(_))));
    }
}
