//! Router configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

use crate::consumer::ConsumerSettings;

/// Top-level router configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Subscriber database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Stream store settings.
    #[serde(default)]
    pub streams: StreamsConfig,

    /// Fan-out settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Health endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Subscriber database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database holding the `subscribers` table.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections, shared by all dispatch tasks.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Startup connection attempts before giving up.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Delay between startup connection attempts, in seconds.
    #[serde(default = "default_connect_retry_secs")]
    pub connect_retry_secs: u64,
}

/// Stream store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamsConfig {
    /// Path to the SQLite database holding stream records. Defaults to the
    /// subscriber database.
    #[serde(default)]
    pub path: Option<String>,

    /// Inbound news stream.
    #[serde(default = "default_inbound")]
    pub inbound: String,

    /// Outbound alert stream.
    #[serde(default = "default_outbound")]
    pub outbound: String,

    /// Idle poll interval while the inbound stream is empty, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause after a failed inbound read, in milliseconds.
    #[serde(default = "default_read_retry_ms")]
    pub read_retry_ms: u64,
}

/// Fan-out configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Subscribers fetched per pagination query.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum concurrently running match/publish tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Whether to serve `/health`.
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "herald_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_db_path() -> String {
    "herald.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    25
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_connect_retry_secs() -> u64 {
    5
}

fn default_inbound() -> String {
    "news".to_string()
}

fn default_outbound() -> String {
    "alerts".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_read_retry_ms() -> u64 {
    1_000
}

fn default_batch_size() -> usize {
    100
}

fn default_workers() -> usize {
    50
}

fn default_server_enabled() -> bool {
    true
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            connect_attempts: default_connect_attempts(),
            connect_retry_secs: default_connect_retry_secs(),
        }
    }
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            path: None,
            inbound: default_inbound(),
            outbound: default_outbound(),
            poll_interval_ms: default_poll_interval_ms(),
            read_retry_ms: default_read_retry_ms(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Path of the stream database, falling back to the subscriber database.
    pub fn stream_db_path(&self) -> &str {
        self.streams.path.as_deref().unwrap_or(&self.database.path)
    }

    /// Consumer loop settings derived from `[streams]`.
    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            inbound: self.streams.inbound.clone(),
            poll_interval: Duration::from_millis(self.streams.poll_interval_ms),
            read_retry: Duration::from_millis(self.streams.read_retry_ms),
        }
    }

    /// Clamps values that would stall the pipeline.
    fn normalize(&mut self) {
        self.dispatch.workers = self.dispatch.workers.max(1);
        self.dispatch.batch_size = self.dispatch.batch_size.max(1);
        self.database.connect_attempts = self.database.connect_attempts.max(1);
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HERALD_DB_PATH` overrides `database.path`
/// - `HERALD_STREAM_DB_PATH` overrides `streams.path`
/// - `HERALD_INBOUND_STREAM` overrides `streams.inbound`
/// - `HERALD_OUTBOUND_STREAM` overrides `streams.outbound`
/// - `HERALD_WORKERS` overrides `dispatch.workers`
/// - `HERALD_BATCH_SIZE` overrides `dispatch.batch_size`
/// - `HERALD_HOST` overrides `server.host`
/// - `HERALD_PORT` overrides `server.port`
/// - `HERALD_LOG_LEVEL` overrides `logging.level`
/// - `HERALD_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.normalize();
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(path) = var("HERALD_DB_PATH") {
        config.database.path = path;
    }
    if let Some(path) = var("HERALD_STREAM_DB_PATH") {
        config.streams.path = Some(path);
    }
    if let Some(stream) = var("HERALD_INBOUND_STREAM") {
        config.streams.inbound = stream;
    }
    if let Some(stream) = var("HERALD_OUTBOUND_STREAM") {
        config.streams.outbound = stream;
    }
    if let Some(Ok(workers)) = var("HERALD_WORKERS").map(|v| v.parse::<usize>()) {
        config.dispatch.workers = workers;
    }
    if let Some(Ok(batch_size)) = var("HERALD_BATCH_SIZE").map(|v| v.parse::<usize>()) {
        config.dispatch.batch_size = batch_size;
    }
    if let Some(Ok(host)) = var("HERALD_HOST").map(|v| v.parse::<IpAddr>()) {
        config.server.host = host;
    }
    if let Some(Ok(port)) = var("HERALD_PORT").map(|v| v.parse::<u16>()) {
        config.server.port = port;
    }
    if let Some(level) = var("HERALD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("HERALD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
