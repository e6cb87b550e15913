//! Configuration loading.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. An explicit path passed by the host process
//! 2. `~/.runesmith/config.toml` (user)
//! 3. `/etc/runesmith/config.toml` (system)
//! 4. Built-in defaults
//!
//! Environment overrides are applied separately by
//! [`Config::apply_env_overrides`], which the process entry point calls
//! once. Nothing else in the crate reads the environment.
//!
//! ```toml
//! [dispatch]
//! request_timeout_secs = 30
//! enable_fallback = true
//! enable_cache = true
//!
//! [cache]
//! max_entries = 100
//! ttl_secs = 3600
//! sweep_interval_secs = 300
//!
//! [jobs]
//! retention_secs = 3600
//! sweep_interval_secs = 300
//!
//! [routing]
//! default_method = "svg_template"
//! safe_default = "mermaid"
//! fallback_order = ["svg_template", "mermaid", "python_chart"]
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::routing::RoutingConfig;
use crate::{Result, RunesmithError};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchConfig {
    /// Per-attempt deadline in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    #[serde(default = "default_true")]
    pub enable_cache: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            enable_fallback: true,
            enable_cache: true,
        }
    }
}

impl DispatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Result cache settings as written in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_one_hour")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_one_hour(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        CacheConfig::new()
            .max_entries(settings.max_entries)
            .ttl(Duration::from_secs(settings.ttl_secs))
            .sweep_interval(Duration::from_secs(settings.sweep_interval_secs))
    }
}

fn default_max_entries() -> usize {
    100
}

fn default_one_hour() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    300
}

/// Job ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobsConfig {
    /// How long finished jobs stay pollable (default: 1 hour).
    #[serde(default = "default_one_hour")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_one_hour(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl JobsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path that does not exist is an error; otherwise a
    /// missing file means defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RunesmithError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            RunesmithError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(RunesmithError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".runesmith").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/runesmith/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.request_timeout_secs == 0 {
            return Err(RunesmithError::Configuration(
                "dispatch.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(RunesmithError::Configuration(
                "cache.max_entries must be positive".to_string(),
            ));
        }
        if self.cache.sweep_interval_secs == 0 || self.jobs.sweep_interval_secs == 0 {
            return Err(RunesmithError::Configuration(
                "sweep intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    ///
    /// Recognised: `REQUEST_TIMEOUT` (secs), `CACHE_TTL` (secs),
    /// `ENABLE_CACHE`, `ENABLE_FALLBACK`, `JOB_CLEANUP_HOURS`, `LOG_LEVEL`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("REQUEST_TIMEOUT") {
            self.dispatch.request_timeout_secs = parse_u64("REQUEST_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("CACHE_TTL") {
            self.cache.ttl_secs = parse_u64("CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("ENABLE_CACHE") {
            self.dispatch.enable_cache = parse_bool("ENABLE_CACHE", &v)?;
        }
        if let Some(v) = lookup("ENABLE_FALLBACK") {
            self.dispatch.enable_fallback = parse_bool("ENABLE_FALLBACK", &v)?;
        }
        if let Some(v) = lookup("JOB_CLEANUP_HOURS") {
            let hours = parse_u64("JOB_CLEANUP_HOURS", &v)?;
            self.jobs.retention_secs = hours.saturating_mul(3600);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v.trim().to_lowercase();
        }
        self.validate()
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|e| {
        RunesmithError::Configuration(format!("{key} must be a whole number, got '{value}': {e}"))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RunesmithError::Configuration(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
}
