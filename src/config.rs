//! Configuration types for rulescan

use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Indicator and data-quality settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// ATR rolling period
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Trailing window for relative volume
    #[serde(default = "default_rel_volume_period")]
    pub rel_volume_period: usize,

    /// Window for rolling highest high / lowest low
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// A symbol whose malformed-bar fraction exceeds this is skipped
    #[serde(default = "default_max_malformed_fraction")]
    pub max_malformed_fraction: f64,
}

fn default_atr_period() -> usize {
    14
}
fn default_rel_volume_period() -> usize {
    20
}
fn default_rolling_window() -> usize {
    20
}
fn default_max_malformed_fraction() -> f64 {
    0.2
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            rel_volume_period: 20,
            rolling_window: 20,
            max_malformed_fraction: 0.2,
        }
    }
}

/// Job manager settings
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Admission ceiling: maximum concurrently running jobs
    #[serde(default = "default_max_running")]
    pub max_running: usize,

    /// Submissions allowed per caller per rolling window
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: usize,

    /// Rolling rate-limit window (seconds)
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Symbols per chunk
    #[serde(default = "default_symbols_per_chunk")]
    pub symbols_per_chunk: usize,

    /// Worker pool bound for chunk execution across all jobs
    #[serde(default = "default_worker_pool")]
    pub worker_pool: usize,

    /// Job wall-clock budget (seconds)
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Per-fetch timeout against the bar provider (seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// How long terminal jobs stay pollable before eviction (seconds)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Cleanup task wakeup interval (seconds)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_max_running() -> usize {
    4
}
fn default_rate_limit_max() -> usize {
    10
}
fn default_rate_limit_window_secs() -> u64 {
    60
}
fn default_symbols_per_chunk() -> usize {
    25
}
fn default_worker_pool() -> usize {
    4
}
fn default_job_timeout_secs() -> u64 {
    300
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_retention_secs() -> u64 {
    600
}
fn default_cleanup_interval_secs() -> u64 {
    30
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_running: 4,
            rate_limit_max: 10,
            rate_limit_window_secs: 60,
            symbols_per_chunk: 25,
            worker_pool: 4,
            job_timeout_secs: 300,
            fetch_timeout_secs: 10,
            retention_secs: 600,
            cleanup_interval_secs: 30,
        }
    }
}

/// Parameter classifier settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Rule-based confidence below which the secondary classifier runs
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: f64,
}

fn default_ambiguity_threshold() -> f64 {
    0.6
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ambiguity_threshold: 0.6,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
