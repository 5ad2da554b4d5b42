//! Configuration management for reinet.
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

use crate::cli::Args;
use crate::dispatch::DEFAULT_MAX_BODY_BYTES;
use crate::server::ServerConfig;
use crate::session::{SessionConfig, DEFAULT_COOKIE_NAME, DEFAULT_MAX_LIFETIME, DEFAULT_PROVIDER};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session configuration.
    pub session: SessionSection,
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
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
    /// Largest request body read for a handler.
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Session cookie name.
    pub cookie_name: String,
    /// Idle seconds before a session expires.
    pub max_lifetime_secs: u64,
    /// Session provider name.
    pub provider: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_lifetime_secs: DEFAULT_MAX_LIFETIME.as_secs(),
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
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
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Values that fail to parse are ignored.
    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("REINET_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("REINET_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(name) = var("REINET_COOKIE_NAME").filter(|n| !n.is_empty()) {
            self.session.cookie_name = name;
        }

        if let Some(secs) = var("REINET_SESSION_LIFETIME").and_then(|s| s.parse().ok()) {
            self.session.max_lifetime_secs = secs;
        }

        if let Some(level) = var("REINET_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
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

        if let Some(ref name) = args.cookie_name {
            self.session.cookie_name = name.clone();
        }

        if let Some(secs) = args.session_lifetime {
            self.session.max_lifetime_secs = secs;
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

    /// Convert to ServerConfig for the HTTP server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let server_config = ServerConfig::new(host.to_string(), self.server.port);
        if self.server.graceful_shutdown {
            Ok(server_config)
        } else {
            Ok(server_config.without_graceful_shutdown())
        }
    }

    /// Convert to SessionConfig for the session manager.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        if self.session.max_lifetime_secs == 0 {
            return Err(ConfigError::InvalidLifetime);
        }
        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::InvalidCookieName);
        }

        Ok(SessionConfig {
            cookie_name: self.session.cookie_name.clone(),
            max_lifetime: Duration::from_secs(self.session.max_lifetime_secs),
            provider: self.session.provider.clone(),
        })
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
    /// Session lifetime of zero.
    InvalidLifetime,
    /// Empty session cookie name.
    InvalidCookieName,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidLifetime => write!(f, "session lifetime must be at least one second"),
            Self::InvalidCookieName => write!(f, "session cookie name must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}
