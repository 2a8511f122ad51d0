//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `flamewatch.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use flamewatch_adapter_mqtt::MqttConfig;
use flamewatch_domain::zone::{DEFAULT_SMOKE_THRESHOLD, DEFAULT_TEMP_THRESHOLD, Thresholds};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Broker connection and ingestion concurrency.
    pub mqtt: MqttConfig,
    /// Defaults for zones created without explicit thresholds.
    pub zones: ZonesConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Pool size. Ignored for in-memory databases.
    pub max_connections: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Zone defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    pub default_temp_threshold: f64,
    pub default_smoke_threshold: f64,
}

impl ZonesConfig {
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            temperature: self.default_temp_threshold,
            smoke: self.default_smoke_threshold,
        }
    }
}

impl Config {
    /// Load configuration from `flamewatch.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("flamewatch.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("FLAMEWATCH_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("FLAMEWATCH_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("FLAMEWATCH_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("FLAMEWATCH_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("FLAMEWATCH_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = var("FLAMEWATCH_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(val) = var("FLAMEWATCH_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt broker_port must be non-zero".to_string(),
            ));
        }
        if self.mqtt.max_in_flight == 0 {
            return Err(ConfigError::Validation(
                "mqtt max_in_flight must be at least 1".to_string(),
            ));
        }
        self.zones
            .thresholds()
            .validate()
            .map_err(|err| ConfigError::Validation(format!("zones: {err}")))?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:flamewatch.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "flamewatchd=info,flamewatch=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            default_temp_threshold: DEFAULT_TEMP_THRESHOLD,
            default_smoke_threshold: DEFAULT_SMOKE_THRESHOLD,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
