//! Configuration system (layered: code > env > config file > defaults).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::action::ImageGeneration;
use crate::error::{GateError, Result};
use crate::util::retry::RetryPolicy;

/// Threshold applied to actions without an override.
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Where pending records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Directory for the file backend. Defaults to `~/.gatehouse`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Retry settings in file-friendly units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            multiplier: policy.multiplier,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }

    /// Reject settings the retry loop cannot use.
    pub fn validate(&self) -> Result<()> {
        self.to_policy()
            .validate()
            .map_err(|reason| GateError::Configuration(format!("invalid retry settings: {reason}")))
    }
}

/// Gatehouse configuration.
///
/// Built explicitly and handed to [`GateContext`](crate::context::GateContext);
/// nothing here is global.
///
/// ```toml
/// default_threshold = 5
/// expiry_secs = 86400
///
/// [thresholds]
/// image_generation = 1
///
/// [store]
/// backend = "file"
/// dir = "/var/lib/gatehouse"
///
/// [retry]
/// max_attempts = 5
/// initial_backoff_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub default_threshold: u32,
    /// Per-action threshold overrides, keyed by action name.
    pub thresholds: HashMap<String, u32>,
    /// Seconds an awaiting request may wait before it is reclaimed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_secs: Option<u64>,
    pub store: StoreSettings,
    pub retry: RetrySettings,
}

impl Default for GateConfig {
    fn default() -> Self {
        let mut thresholds = HashMap::new();
        thresholds.insert(ImageGeneration::NAME.to_string(), 1);
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            thresholds,
            expiry_secs: None,
            store: StoreSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl GateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| GateError::Configuration(format!("invalid config: {e}")))?;
        config.retry.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GateError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Defaults, then `GATEHOUSE_*` variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults, then the optional config file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("GATEHOUSE_THRESHOLD") {
            self.default_threshold = parse_env("GATEHOUSE_THRESHOLD", &raw)?;
        }
        if let Some(raw) = lookup("GATEHOUSE_EXPIRY_SECS") {
            let secs: u64 = parse_env("GATEHOUSE_EXPIRY_SECS", &raw)?;
            self.expiry_secs = (secs > 0).then_some(secs);
        }
        if let Some(raw) = lookup("GATEHOUSE_STORE") {
            self.store.backend = parse_env("GATEHOUSE_STORE", &raw)?;
        }
        if let Some(raw) = lookup("GATEHOUSE_STORE_DIR") {
            self.store.dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("GATEHOUSE_RETRY_ATTEMPTS") {
            self.retry.max_attempts = parse_env("GATEHOUSE_RETRY_ATTEMPTS", &raw)?;
        }
        self.retry.validate()
    }

    pub fn with_default_threshold(mut self, threshold: u32) -> Self {
        self.default_threshold = threshold;
        self
    }

    pub fn with_threshold(mut self, action: impl Into<String>, threshold: u32) -> Self {
        self.thresholds.insert(action.into(), threshold);
        self
    }

    /// Expiry for awaiting requests. A zero TTL disables expiry and a
    /// sub-second one rounds up to a second.
    pub fn with_expiry(mut self, ttl: Option<Duration>) -> Self {
        self.expiry_secs = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| ttl.as_secs().max(1));
        self
    }

    pub fn with_store(mut self, backend: StoreBackend, dir: Option<PathBuf>) -> Self {
        self.store = StoreSettings { backend, dir };
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Threshold for `action`, falling back to the default.
    pub fn threshold_for(&self, action: &str) -> u32 {
        self.thresholds
            .get(action)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    pub fn expiry(&self) -> Option<Duration> {
        self.expiry_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }

    /// Directory used by the file backend.
    pub fn store_dir(&self) -> PathBuf {
        self.store.dir.clone().unwrap_or_else(default_gatehouse_dir)
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| GateError::Configuration(format!("{key}={raw:?}: {e}")))
}

fn default_gatehouse_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".gatehouse"))
        .unwrap_or_else(|| PathBuf::from(".gatehouse"))
}
