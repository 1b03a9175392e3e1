//! Configuration management for irrigd.
//!
//! Loads settings from `$IRRIGD_CONFIG`, then /etc/irrigd/config.toml, or
//! uses defaults. A handful of deployment values can be overridden through
//! environment variables after the file is read.

use anyhow::{bail, Context, Result};
use irrig_shared::policy::{DEFAULT_THRESHOLD_ML, MAX_VOLUME_ML, MIN_VOLUME_ML};
use irrig_shared::ThresholdPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/irrigd/config.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "IRRIGD_CONFIG";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding the front-end (index.html)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Grace period for in-flight actuations on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_shutdown_grace() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            static_dir: default_static_dir(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

/// Telemetry feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed endpoint; the thing name is appended as the last path segment
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,

    /// Device identifier on the feed
    #[serde(default = "default_thing_name")]
    pub thing_name: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-fetch timeout
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

fn default_feed_base_url() -> String {
    "https://dweet.io/get/latest/dweet/for".to_string()
}

fn default_thing_name() -> String {
    "my-pump-thing".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_feed_timeout() -> u64 {
    5
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            thing_name: default_thing_name(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_feed_timeout(),
        }
    }
}

impl FeedConfig {
    pub fn url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.thing_name)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pump actuator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Device address (host or host:port), or a full http(s) base URL
    #[serde(default = "default_actuator_address")]
    pub address: String,

    #[serde(default = "default_actuator_timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent actuator calls
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Pending actuations beyond this are shed
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_actuator_address() -> String {
    "192.168.137.100".to_string()
}

fn default_actuator_timeout() -> u64 {
    3
}

fn default_max_in_flight() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    32
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            address: default_actuator_address(),
            timeout_secs: default_actuator_timeout(),
            max_in_flight: default_max_in_flight(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl ActuatorConfig {
    /// Pump endpoint URL without the query string.
    pub fn pump_url(&self) -> String {
        let base = self.address.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}/pump", base)
        } else {
            format!("http://{}/pump", base)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Threshold policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_threshold")]
    pub threshold_ml: f64,

    #[serde(default = "default_min_volume")]
    pub min_volume_ml: f64,

    #[serde(default = "default_max_volume")]
    pub max_volume_ml: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_ML
}

fn default_min_volume() -> f64 {
    MIN_VOLUME_ML
}

fn default_max_volume() -> f64 {
    MAX_VOLUME_ML
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            threshold_ml: default_threshold(),
            min_volume_ml: default_min_volume(),
            max_volume_ml: default_max_volume(),
        }
    }
}

impl PolicyConfig {
    pub fn to_policy(&self) -> ThresholdPolicy {
        ThresholdPolicy {
            threshold_ml: self.threshold_ml,
            min_volume_ml: self.min_volume_ml,
            max_volume_ml: self.max_volume_ml,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Exported regression pipeline (JSON)
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("sensor_data.csv")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub actuator: ActuatorConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

impl Config {
    /// Load config from file and environment, or return validated defaults.
    ///
    /// An explicit `$IRRIGD_CONFIG` that cannot be read is an error; a
    /// missing system config falls back to defaults.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load_from_path(&path)
                .with_context(|| format!("Failed to load config from ${}", CONFIG_ENV))?,
            Err(_) => Self::load_from_path(CONFIG_PATH).unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            }),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `IRRIGD_*` overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("IRRIGD_LISTEN") {
            self.server.listen = v;
        }
        if let Some(v) = lookup("IRRIGD_ACTUATOR_ADDR") {
            self.actuator.address = v;
        }
        if let Some(v) = lookup("IRRIGD_THING_NAME") {
            self.feed.thing_name = v;
        }
        if let Some(v) = lookup("IRRIGD_THRESHOLD_ML") {
            self.policy.threshold_ml = v
                .trim()
                .parse()
                .with_context(|| format!("IRRIGD_THRESHOLD_ML is not a number: {:?}", v))?;
        }
        if let Some(v) = lookup("IRRIGD_MODEL_PATH") {
            self.model.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("IRRIGD_HISTORY_PATH") {
            self.history.path = PathBuf::from(v);
        }
        Ok(())
    }

    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.feed.poll_interval_secs == 0 {
            bail!("feed.poll_interval_secs must be > 0");
        }
        if self.feed.timeout_secs == 0 {
            bail!("feed.timeout_secs must be > 0");
        }
        if self.actuator.timeout_secs == 0 {
            bail!("actuator.timeout_secs must be > 0");
        }
        if self.actuator.max_in_flight == 0 {
            bail!("actuator.max_in_flight must be >= 1");
        }
        if self.actuator.queue_capacity == 0 {
            bail!("actuator.queue_capacity must be >= 1");
        }
        if self.feed.thing_name.trim().is_empty() {
            bail!("feed.thing_name must not be empty");
        }
        if !self.policy.to_policy().is_valid() {
            bail!(
                "policy is invalid: threshold={} range=[{}, {}]",
                self.policy.threshold_ml,
                self.policy.min_volume_ml,
                self.policy.max_volume_ml
            );
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_secs)
    }
}
