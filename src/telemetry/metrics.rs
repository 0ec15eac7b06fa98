//! Job and scan metrics

use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Jobs admitted and started
    JobsSubmitted,
    /// Submissions rejected at the admission ceiling
    RejectedCapacity,
    /// Submissions rejected by the rate limiter
    RejectedRateLimit,
    /// Jobs that completed cleanly
    JobsCompleted,
    /// Jobs that failed
    JobsFailed,
    /// Jobs cancelled by request or timeout
    JobsCancelled,
    /// Terminal jobs evicted by cleanup
    JobsEvicted,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Currently running jobs
    RunningJobs,
    /// Jobs retained in the manager (any state)
    RetainedJobs,
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric) {
    let name = match metric {
        CounterMetric::JobsSubmitted => "rulescan_jobs_submitted_total",
        CounterMetric::RejectedCapacity => "rulescan_jobs_rejected_capacity_total",
        CounterMetric::RejectedRateLimit => "rulescan_jobs_rejected_rate_limit_total",
        CounterMetric::JobsCompleted => "rulescan_jobs_completed_total",
        CounterMetric::JobsFailed => "rulescan_jobs_failed_total",
        CounterMetric::JobsCancelled => "rulescan_jobs_cancelled_total",
        CounterMetric::JobsEvicted => "rulescan_jobs_evicted_total",
    };
    metrics::counter!(name).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::RunningJobs => "rulescan_running_jobs",
        GaugeMetric::RetainedJobs => "rulescan_retained_jobs",
    };
    metrics::gauge!(name).set(value);
}

/// Record a scan duration
pub fn record_scan_duration(duration: Duration) {
    metrics::histogram!("rulescan_job_duration_seconds").record(duration.as_secs_f64());
}
