// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the key generation service.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. qkd.yaml file
//! 3. Environment variables (QKD_*, plus PORT)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend configurations
    #[serde(default)]
    pub backends: BackendsConfig,

    /// BB84 protocol settings
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Latest-key persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        } else {
            for path in &["qkd.yaml", "qkd.yml", "/etc/qkd-service/config.yaml"] {
                let path = Path::new(path);
                if path.exists() {
                    config = Self::from_file(path)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("QKD_HOST") {
            self.server.host = val;
        }
        // PORT is what hosting platforms inject; QKD_PORT wins when both are set.
        for var in ["PORT", "QKD_PORT"] {
            if let Ok(val) = env::var(var) {
                if let Ok(port) = val.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = env::var("QKD_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("QKD_CORS_ALLOW_ALL") {
            self.server.cors.allow_all = parse_flag(&val);
        }
        if let Ok(val) = env::var("QKD_CORS_ALLOWED_ORIGINS") {
            self.server.cors.allowed_origins =
                val.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(val) = env::var("QKD_KEY_LENGTH") {
            if let Ok(len) = val.parse() {
                self.protocol.default_key_length = len;
            }
        }
        if let Ok(val) = env::var("QKD_MEASUREMENT_MODE") {
            match val.to_lowercase().as_str() {
                "bob_basis" | "bob-basis" => self.protocol.measurement = MeasurementMode::BobBasis,
                "alice_basis_only" | "alice-basis-only" => {
                    self.protocol.measurement = MeasurementMode::AliceBasisOnly
                }
                other => tracing::warn!(value = %other, "Ignoring unknown QKD_MEASUREMENT_MODE"),
            }
        }
        if let Ok(val) = env::var("QKD_SEED") {
            if let Ok(seed) = val.parse() {
                self.protocol.seed = Some(seed);
            }
        }
        if let Ok(val) = env::var("QKD_KEY_STORE_PATH") {
            self.storage.path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("QKD_PERSIST_KEYS") {
            self.storage.enabled = parse_flag(&val);
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("port cannot be 0".into()));
        }
        if self.server.timeout_sec == 0 {
            return Err(Error::Config("server.timeout_sec cannot be 0".into()));
        }
        if self.backends.local_simulator.enabled && self.backends.local_simulator.timeout_sec == 0 {
            return Err(Error::Config(
                "local_simulator.timeout_sec cannot be 0".into(),
            ));
        }
        if self.protocol.default_key_length > self.protocol.max_key_length {
            return Err(Error::Config(format!(
                "default_key_length {} exceeds max_key_length {}",
                self.protocol.default_key_length, self.protocol.max_key_length
            )));
        }
        if self.protocol.default_key_length == 0 && !self.protocol.allow_empty_key {
            return Err(Error::Config(
                "default_key_length must be at least 1 unless allow_empty_key is set".into(),
            ));
        }
        let sim = &self.backends.local_simulator;
        if sim.enabled && sim.max_batch_size < self.protocol.max_key_length {
            return Err(Error::Config(format!(
                "local_simulator.max_batch_size {} is smaller than max_key_length {}",
                sim.max_batch_size, self.protocol.max_key_length
            )));
        }
        if self.storage.enabled && self.storage.path.as_os_str().is_empty() {
            return Err(Error::Config("storage path cannot be empty".into()));
        }
        if self.server.cors.allow_all {
            tracing::warn!(
                "CORS is set to allow all origins. \
                 Set QKD_CORS_ALLOW_ALL=false or configure specific origins to restrict it."
            );
        }
        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_sec: u64,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Graceful shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_sec: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_sec: default_timeout(),
            cors: CorsConfig::default(),
            shutdown_timeout_sec: default_shutdown_timeout(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allow all origins
    #[serde(default = "default_true")]
    pub allow_all: bool,

    /// Allowed origins when allow_all is false
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            // Browser dashboards call the service cross-origin.
            allow_all: true,
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://127.0.0.1:3000".into(),
            ],
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8081
}

fn default_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Backend configurations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// In-process state-vector simulator
    #[serde(default)]
    pub local_simulator: LocalSimulatorConfig,
}

/// Local simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSimulatorConfig {
    /// Whether the backend is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seed for measurement sampling (unseeded when absent)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Batch execution timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_sec: u64,

    /// Maximum circuits per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for LocalSimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: None,
            timeout_sec: default_timeout(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_batch_size() -> usize {
    65_536
}

/// Whether Bob's basis choice rotates the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMode {
    /// Measure in the computational basis after Alice's preparation only.
    /// Bob's bases are bookkeeping for sifting.
    AliceBasisOnly,
    /// Apply a Hadamard before measurement when Bob picked the diagonal basis.
    #[default]
    BobBasis,
}

/// BB84 protocol configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Bits attempted per run when the caller does not ask for a length
    #[serde(default = "default_key_length")]
    pub default_key_length: usize,

    /// Upper bound on a requested key length
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,

    /// Accept key_length == 0 and return an empty key
    #[serde(default)]
    pub allow_empty_key: bool,

    /// Measurement model
    #[serde(default)]
    pub measurement: MeasurementMode,

    /// Seed for basis and bit choices (fresh randomness when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_key_length: default_key_length(),
            max_key_length: default_max_key_length(),
            allow_empty_key: false,
            measurement: MeasurementMode::default(),
            seed: None,
        }
    }
}

fn default_key_length() -> usize {
    32
}

fn default_max_key_length() -> usize {
    4096
}

/// Latest-key persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Persist each generated key
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Location of the latest key document
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("quantum/keys/latest_key.json")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
