//! Configuration management for session-relay.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::broker::BrokerConfig;
use crate::cli::Args;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Relay protocol configuration.
    pub relay: RelaySection,
    /// Reaper configuration.
    pub reaper: ReaperSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Accept backlog size.
    pub backlog: u32,
    /// HTTP worker pool size (0 = runtime default).
    pub worker_threads: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            backlog: 128,
            worker_threads: 0,
        }
    }
}

/// Relay protocol configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    /// Maximum concurrently alive sessions (hence worker tasks).
    pub max_sessions: usize,
    /// Per-exchange reply timeout in milliseconds.
    pub reply_timeout_ms: u64,
    /// Upper bound on relay body size in bytes.
    pub max_body_bytes: usize,
    /// Orphaned-worker give-up bound in seconds.
    pub worker_idle_secs: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            reply_timeout_ms: 10_000,
            max_body_bytes: 65_536,
            worker_idle_secs: 300,
        }
    }
}

/// Reaper configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperSection {
    /// Sweep interval in seconds.
    pub interval_secs: u64,
    /// Maximum session idle age in seconds.
    pub max_idle_secs: u64,
}

impl Default for ReaperSection {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            max_idle_secs: 600,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SESSION_RELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("SESSION_RELAY_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(max) = std::env::var("SESSION_RELAY_MAX_SESSIONS") {
            if let Ok(max) = max.parse() {
                self.relay.max_sessions = max;
            }
        }

        if let Ok(timeout) = std::env::var("SESSION_RELAY_REPLY_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                self.relay.reply_timeout_ms = timeout;
            }
        }

        if let Ok(level) = std::env::var("SESSION_RELAY_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(max) = args.max_sessions {
            self.relay.max_sessions = max;
        }
        if let Some(timeout) = args.reply_timeout_ms {
            self.relay.reply_timeout_ms = timeout;
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        Ok(ServerConfig::new(host.to_string(), self.server.port)
            .with_backlog(self.server.backlog))
    }

    /// Convert to the broker's protocol tunables.
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            reply_timeout: Duration::from_millis(self.relay.reply_timeout_ms),
            max_sessions: self.relay.max_sessions,
            worker_idle: Duration::from_secs(self.relay.worker_idle_secs),
        }
    }

    /// Reaper sweep interval.
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper.interval_secs)
    }

    /// Maximum session idle age before the reaper removes it.
    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.reaper.max_idle_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.relay.max_sessions, 64);
        assert_eq!(config.relay.reply_timeout_ms, 10_000);
        assert_eq!(config.reaper.max_idle_secs, 600);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "server": {
                "host": "0.0.0.0",
                "port": 8080,
                "backlog": 512
            },
            "relay": {
                "max_sessions": 8,
                "reply_timeout_ms": 2500
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.backlog, 512);
        assert_eq!(config.relay.max_sessions, 8);
        assert_eq!(config.relay.reply_timeout_ms, 2500);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{
            "reaper": {
                "max_idle_secs": 120
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1"); // Default
        assert_eq!(config.reaper.max_idle_secs, 120);
        assert_eq!(config.reaper.interval_secs, 30); // Default
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            host: Some("192.168.1.1".parse().unwrap()),
            port: Some(5000),
            max_sessions: Some(2),
            reply_timeout_ms: Some(750),
            log_level: Some("debug".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.relay.max_sessions, 2);
        assert_eq!(config.relay.reply_timeout_ms, 750);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_args_absent_do_not_override() {
        let mut config = Config::default();
        config.server.port = 9000;

        config.apply_args(&Args::default());
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_server_config_conversion() {
        let config = Config::default();
        let server_config = config.server_config().unwrap();

        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 3000);
        assert_eq!(server_config.backlog, 128);
    }

    #[test]
    fn test_broker_config_conversion() {
        let config = Config::default();
        let broker_config = config.broker_config();

        assert_eq!(broker_config.reply_timeout, Duration::from_secs(10));
        assert_eq!(broker_config.max_sessions, 64);
        assert_eq!(broker_config.worker_idle, Duration::from_secs(300));
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();

        let result = config.server_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"max_sessions\""));
        assert!(json.contains("\"reply_timeout_ms\""));
    }
}
