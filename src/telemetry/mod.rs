//! Telemetry module
//!
//! Metrics and structured logging

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{
    increment_counter, record_scan_duration, set_gauge, CounterMetric, GaugeMetric,
};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)
}
