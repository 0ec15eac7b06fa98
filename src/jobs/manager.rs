//! Scan job orchestration
//!
//! Admission control, rate limiting, chunked parallel execution,
//! monotonic progress, and terminal-job cleanup. All mutation of a job's
//! shared fields happens under that job's own lock; the per-job driver
//! task is the sole writer of its progress field.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, RwLock, Semaphore};
use uuid::Uuid;

use crate::bars::BarProvider;
use crate::config::{JobsConfig, ScanConfig};
use crate::indicators::IndicatorSpec;
use crate::pattern::normalize_source;
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};

use super::chunk::{plan_chunks, run_chunk, ChunkSpec};
use super::progress::ProgressAggregator;
use super::rate_limit::AdmissionState;
use super::types::{
    ChunkExecutionError, JobId, JobSnapshot, JobStatus, ScanJob, ScanRequest, SubmitError,
    SymbolUniverse,
};

/// What a chunk task leaves for the driver once its signals and warnings
/// are already published into the job: the skipped-row count, or the
/// chunk-level failure
type ChunkHandoff = Result<usize, ChunkExecutionError>;

/// Per-job shared handle: state behind the job's own lock plus the
/// cooperative cancellation flag
#[derive(Clone)]
struct JobHandle {
    job: Arc<Mutex<ScanJob>>,
    cancel: Arc<AtomicBool>,
}

/// Top-level orchestrator for scan jobs
pub struct ScanJobManager {
    jobs_config: JobsConfig,
    scan_config: ScanConfig,
    provider: Arc<dyn BarProvider>,
    /// Single lock over the global running count and rate windows
    admission: Mutex<AdmissionState>,
    jobs: RwLock<HashMap<JobId, JobHandle>>,
    /// Bounded worker pool shared by every job's chunks
    workers: Arc<Semaphore>,
}

impl ScanJobManager {
    /// Create a manager over a bar provider
    pub fn new(
        jobs_config: JobsConfig,
        scan_config: ScanConfig,
        provider: Arc<dyn BarProvider>,
    ) -> Arc<Self> {
        let admission = AdmissionState::new(
            jobs_config.max_running,
            jobs_config.rate_limit_max,
            Duration::from_secs(jobs_config.rate_limit_window_secs),
        );
        let workers = Arc::new(Semaphore::new(jobs_config.worker_pool.max(1)));
        Arc::new(Self {
            jobs_config,
            scan_config,
            provider,
            admission: Mutex::new(admission),
            jobs: RwLock::new(HashMap::new()),
            workers,
        })
    }

    /// Submit a scan. Pattern errors, capacity, and rate-limit rejections
    /// are all synchronous; an accepted job runs in the background and is
    /// observed through [`ScanJobManager::status`].
    pub async fn submit(self: &Arc<Self>, request: ScanRequest) -> Result<JobId, SubmitError> {
        // Pattern validation happens before admission so a bad upload
        // never consumes a running slot.
        let patterns = normalize_source(&request.pattern_source)?;

        {
            let mut admission = self.admission.lock().await;
            match admission.try_admit(&request.caller, Instant::now()) {
                Ok(()) => {}
                Err(err) => {
                    match &err {
                        SubmitError::CapacityExceeded { .. } => {
                            increment_counter(CounterMetric::RejectedCapacity)
                        }
                        SubmitError::RateLimited { .. } => {
                            increment_counter(CounterMetric::RejectedRateLimit)
                        }
                        _ => {}
                    }
                    return Err(err);
                }
            }
            set_gauge(GaugeMetric::RunningJobs, admission.running() as f64);
        }

        let symbols = match self.resolve_universe(&request.universe).await {
            Ok(symbols) => symbols,
            Err(err) => {
                // The job never started; give back the slot and the
                // caller's rate-window quota.
                let mut admission = self.admission.lock().await;
                admission.rollback(&request.caller);
                set_gauge(GaugeMetric::RunningJobs, admission.running() as f64);
                return Err(err);
            }
        };

        let id = Uuid::new_v4();
        let job = ScanJob::new(
            id,
            request.caller.clone(),
            request.range,
            symbols.clone(),
            patterns.clone(),
        );
        let handle = JobHandle {
            job: Arc::new(Mutex::new(job)),
            cancel: Arc::new(AtomicBool::new(false)),
        };
        self.jobs.write().await.insert(id, handle.clone());

        let chunks = plan_chunks(&symbols, request.range, self.jobs_config.symbols_per_chunk);
        increment_counter(CounterMetric::JobsSubmitted);
        tracing::info!(job_id = %id, caller = %request.caller, symbols = symbols.len(), chunks = chunks.len(), "scan job admitted");

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run_job(handle, chunks).await;
        });

        Ok(id)
    }

    /// Consistent snapshot of one job, or `None` if unknown or evicted
    pub async fn status(&self, id: JobId) -> Option<JobSnapshot> {
        let handle = self.jobs.read().await.get(&id).cloned()?;
        let job = handle.job.lock().await;
        Some(job.snapshot())
    }

    /// Request cooperative cancellation. Returns whether the job exists
    /// and was still cancellable.
    pub async fn cancel(&self, id: JobId) -> bool {
        let Some(handle) = self.jobs.read().await.get(&id).cloned() else {
            return false;
        };
        let job = handle.job.lock().await;
        if job.status.is_terminal() {
            return false;
        }
        handle.cancel.store(true, Ordering::Relaxed);
        tracing::info!(job_id = %id, "cancellation requested");
        true
    }

    /// Number of currently running jobs
    pub async fn running_count(&self) -> usize {
        self.admission.lock().await.running()
    }

    /// Evict terminal jobs older than the retention window.
    /// Each eviction takes the job's own lock first, so it cannot race a
    /// poller mid-read.
    pub async fn evict_expired(&self) {
        let retention = chrono::Duration::seconds(self.jobs_config.retention_secs as i64);
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let mut expired = Vec::new();
        for (id, handle) in jobs.iter() {
            let job = handle.job.lock().await;
            if job.status.is_terminal() && now - job.updated_at >= retention {
                expired.push(*id);
            }
        }
        for id in expired {
            jobs.remove(&id);
            increment_counter(CounterMetric::JobsEvicted);
            tracing::debug!(job_id = %id, "terminal job evicted");
        }
        set_gauge(GaugeMetric::RetainedJobs, jobs.len() as f64);
    }

    /// Spawn the background cleanup loop
    pub fn spawn_cleanup(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = Duration::from_secs(self.jobs_config.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                manager.evict_expired().await;
            }
        })
    }

    async fn resolve_universe(
        &self,
        universe: &SymbolUniverse,
    ) -> Result<Vec<String>, SubmitError> {
        let mut symbols = match universe {
            SymbolUniverse::List(list) => list.clone(),
            SymbolUniverse::All => self
                .provider
                .symbols()
                .await
                .map_err(|e| SubmitError::Invalid(format!("symbol listing failed: {e}")))?,
        };
        symbols.sort();
        symbols.dedup();
        if symbols.is_empty() {
            return Err(SubmitError::Invalid("empty symbol universe".to_string()));
        }
        Ok(symbols)
    }

    async fn release_slot(&self) {
        let mut admission = self.admission.lock().await;
        admission.release();
        set_gauge(GaugeMetric::RunningJobs, admission.running() as f64);
    }

    /// Per-job driver: runs chunks on the shared worker pool, owns the
    /// progress aggregator, and writes the terminal state.
    async fn run_job(self: Arc<Self>, handle: JobHandle, chunks: Vec<ChunkSpec>) {
        let started = Instant::now();
        let deadline = started + Duration::from_secs(self.jobs_config.job_timeout_secs);
        let fetch_timeout = Duration::from_secs(self.jobs_config.fetch_timeout_secs);

        let (job_id, patterns, indicator_spec) = {
            let mut job = handle.job.lock().await;
            job.status = JobStatus::Running;
            job.updated_at = Utc::now();
            let columns: Vec<String> = job
                .patterns
                .iter()
                .flat_map(|p| p.expr.columns())
                .collect();
            let mut spec =
                IndicatorSpec::from_columns(columns.iter().map(String::as_str));
            spec.atr_period = self.scan_config.atr_period;
            spec.rel_volume_period = self.scan_config.rel_volume_period;
            spec.rolling_window = self.scan_config.rolling_window;
            (job.id, job.patterns.clone(), spec)
        };

        let weights: Vec<f64> = chunks.iter().map(|c| c.symbols.len() as f64).collect();
        let mut aggregator = ProgressAggregator::new(weights);
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, f64)>();

        // Each task publishes its finished chunk's signals and warnings
        // into the job under the job's own lock, so a poller of a running
        // job sees partial results as chunks complete. The driver only
        // ever adds the terminal state on top.
        let mut tasks: Vec<(usize, tokio::task::JoinHandle<ChunkHandoff>)> =
            Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let manager = Arc::clone(&self);
            let handle = handle.clone();
            let patterns = patterns.clone();
            let spec = indicator_spec.clone();
            let tx = tx.clone();
            let index = chunk.index;
            tasks.push((
                index,
                tokio::spawn(async move {
                    // Acquire errors only on pool shutdown; surface as a
                    // chunk failure rather than panicking the driver.
                    let _permit = match manager.workers.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return Err(ChunkExecutionError::Provider {
                                chunk: chunk.index,
                                symbol: "*".to_string(),
                                reason: "worker pool closed".to_string(),
                            })
                        }
                    };
                    let outcome = run_chunk(
                        &chunk,
                        manager.provider.as_ref(),
                        &patterns,
                        &spec,
                        manager.scan_config.max_malformed_fraction,
                        fetch_timeout,
                        &handle.cancel,
                        &tx,
                    )
                    .await?;

                    let mut job = handle.job.lock().await;
                    job.results.extend(outcome.signals);
                    job.results
                        .sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
                    job.warnings.extend(outcome.warnings);
                    job.updated_at = Utc::now();
                    Ok(outcome.skipped_rows)
                }),
            ));
        }
        drop(tx);

        // Progress loop: the sole writer of progress_percent. On budget
        // exhaustion the cancel flag goes up and chunks wind down at
        // their next symbol boundary, keeping their partial outcomes.
        let mut timed_out = false;
        loop {
            let next = if timed_out {
                rx.recv().await
            } else {
                match tokio::time::timeout_at(deadline.into(), rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        handle.cancel.store(true, Ordering::Relaxed);
                        tracing::warn!(job_id = %job_id, "job wall-clock budget exceeded");
                        continue;
                    }
                }
            };
            match next {
                Some((chunk, sub_progress)) => {
                    if let Some(overall) = aggregator.update(chunk, sub_progress) {
                        let mut job = handle.job.lock().await;
                        job.progress_percent = overall;
                        job.updated_at = Utc::now();
                    }
                }
                None => break,
            }
        }

        let mut failures: Vec<String> = Vec::new();
        let mut skipped_rows = 0usize;
        for (index, task) in tasks {
            match task.await {
                Ok(Ok(skipped)) => skipped_rows += skipped,
                Ok(Err(err)) => failures.push(err.to_string()),
                Err(e) => {
                    failures.push(
                        ChunkExecutionError::Provider {
                            chunk: index,
                            symbol: "*".to_string(),
                            reason: format!("chunk task panicked: {e}"),
                        }
                        .to_string(),
                    );
                }
            }
        }

        let cancelled = handle.cancel.load(Ordering::Relaxed);
        let (status, error) = if cancelled {
            let reason = if timed_out {
                format!(
                    "job timed out after {}s",
                    self.jobs_config.job_timeout_secs
                )
            } else {
                "cancelled by request".to_string()
            };
            (JobStatus::Cancelled, Some(reason))
        } else if !failures.is_empty() {
            (JobStatus::Failed, Some(failures.join("; ")))
        } else {
            (JobStatus::Completed, None)
        };

        {
            let mut job = handle.job.lock().await;
            if skipped_rows > 0 {
                job.warnings.push(format!(
                    "{skipped_rows} rows excluded for incomplete indicator history"
                ));
            }
            job.error = error;
            job.status = status;
            if status == JobStatus::Completed {
                job.progress_percent = aggregator.complete();
            }
            job.updated_at = Utc::now();
        }

        match status {
            JobStatus::Completed => increment_counter(CounterMetric::JobsCompleted),
            JobStatus::Failed => increment_counter(CounterMetric::JobsFailed),
            JobStatus::Cancelled => increment_counter(CounterMetric::JobsCancelled),
            _ => {}
        }
        crate::telemetry::record_scan_duration(started.elapsed());
        self.release_slot().await;
        tracing::info!(job_id = %job_id, ?status, elapsed_ms = started.elapsed().as_millis(), "scan job finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::{BarRecord, DataQualityError, DateRange, StaticBarProvider};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn bar(symbol: &str, day: u32, open: f64, close: f64, volume: f64) -> BarRecord {
        BarRecord {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume,
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            "2024-01-01".parse().unwrap(),
            "2024-01-31".parse().unwrap(),
        )
        .unwrap()
    }

    fn request(caller: &str, source: &str) -> ScanRequest {
        ScanRequest {
            caller: caller.to_string(),
            range: range(),
            universe: SymbolUniverse::All,
            pattern_source: source.to_string(),
        }
    }

    fn provider() -> Arc<StaticBarProvider> {
        Arc::new(StaticBarProvider::new(vec![
            bar("AAPL", 2, 9.0, 11.0, 2_000_000.0),
            bar("AAPL", 3, 11.0, 10.0, 900_000.0),
            bar("MSFT", 2, 50.0, 49.0, 3_000_000.0),
            bar("MSFT", 3, 49.0, 52.0, 4_000_000.0),
        ]))
    }

    fn manager_with(jobs: JobsConfig) -> Arc<ScanJobManager> {
        ScanJobManager::new(jobs, ScanConfig::default(), provider())
    }

    async fn wait_terminal(manager: &Arc<ScanJobManager>, id: JobId) -> JobSnapshot {
        for _ in 0..200 {
            let snapshot = manager.status(id).await.expect("job evicted while waiting");
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job never reached a terminal state");
    }

    #[tokio::test]
    async fn test_submit_and_complete() {
        let manager = manager_with(JobsConfig::default());
        let id = manager
            .submit(request("alice", "momo = close > open and volume >= 1000000"))
            .await
            .unwrap();
        let snapshot = wait_terminal(&manager, id).await;
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress_percent, 100.0);
        // AAPL day 2 and MSFT day 3 both close above open on >=1M volume
        let symbols: Vec<&str> = snapshot.results.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_results_ordered_date_then_symbol() {
        let manager = manager_with(JobsConfig {
            symbols_per_chunk: 1,
            ..Default::default()
        });
        let id = manager
            .submit(request("alice", "any_up = close > open"))
            .await
            .unwrap();
        let snapshot = wait_terminal(&manager, id).await;
        let keys: Vec<(NaiveDate, String)> = snapshot
            .results
            .iter()
            .map(|s| (s.date, s.symbol.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[tokio::test]
    async fn test_bad_pattern_rejected_synchronously() {
        let manager = manager_with(JobsConfig::default());
        let err = manager
            .submit(request("alice", "weird = foo_bar > 10"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Pattern(_)));
        assert!(err.to_string().contains("foo_bar"));
        // Nothing was admitted
        assert_eq!(manager.running_count().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_ceiling_rejects_third_submission() {
        // SlowProvider keeps two jobs running while the third submits
        struct SlowProvider;
        #[async_trait]
        impl BarProvider for SlowProvider {
            async fn fetch(
                &self,
                _symbol: &str,
                _range: DateRange,
            ) -> Result<Vec<BarRecord>, DataQualityError> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(vec![])
            }
            async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
                Ok(vec!["A".to_string()])
            }
        }

        let manager = ScanJobManager::new(
            JobsConfig {
                max_running: 2,
                ..Default::default()
            },
            ScanConfig::default(),
            Arc::new(SlowProvider),
        );
        let req = |caller: &str| request(caller, "up = close > open");
        manager.submit(req("a")).await.unwrap();
        manager.submit(req("b")).await.unwrap();
        let err = manager.submit(req("c")).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::CapacityExceeded {
                running: 2,
                ceiling: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_distinct_from_capacity() {
        let manager = manager_with(JobsConfig {
            max_running: 100,
            rate_limit_max: 1,
            rate_limit_window_secs: 3600,
            ..Default::default()
        });
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        let err = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::RateLimited { max: 1, .. }));
        // A different caller is unaffected
        manager
            .submit(request("bob", "up = close > open"))
            .await
            .unwrap();
        wait_terminal(&manager, id).await;
    }

    #[tokio::test]
    async fn test_slot_released_after_completion() {
        let manager = manager_with(JobsConfig {
            max_running: 1,
            ..Default::default()
        });
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        wait_terminal(&manager, id).await;
        assert_eq!(manager.running_count().await, 0);
        // A new submission fits again
        manager
            .submit(request("bob", "up = close > open"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_progress_monotonic_while_polling() {
        let manager = manager_with(JobsConfig {
            symbols_per_chunk: 1,
            ..Default::default()
        });
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        let mut last = 0.0f64;
        loop {
            let snapshot = manager.status(id).await.unwrap();
            assert!(snapshot.progress_percent >= last);
            last = snapshot.progress_percent;
            if snapshot.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_finished_chunk_results_visible_while_running() {
        // One chunk finishes immediately, the other stalls; a poller of
        // the still-running job must see the finished chunk's signals.
        struct SplitPaceProvider;
        #[async_trait]
        impl BarProvider for SplitPaceProvider {
            async fn fetch(
                &self,
                symbol: &str,
                _range: DateRange,
            ) -> Result<Vec<BarRecord>, DataQualityError> {
                if symbol == "SLOW" {
                    tokio::time::sleep(Duration::from_millis(400)).await;
                }
                Ok(vec![bar(symbol, 2, 9.0, 11.0, 2_000_000.0)])
            }
            async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
                Ok(vec!["FAST".to_string(), "SLOW".to_string()])
            }
        }

        let manager = ScanJobManager::new(
            JobsConfig {
                symbols_per_chunk: 1,
                worker_pool: 2,
                ..Default::default()
            },
            ScanConfig::default(),
            Arc::new(SplitPaceProvider),
        );
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();

        let mut saw_partial = false;
        for _ in 0..200 {
            let snapshot = manager.status(id).await.unwrap();
            if !snapshot.status.is_terminal()
                && snapshot.results.iter().any(|s| s.symbol == "FAST")
            {
                saw_partial = true;
                break;
            }
            if snapshot.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(saw_partial, "running job never exposed partial results");

        let snapshot = wait_terminal(&manager, id).await;
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.results.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_universe_burns_no_rate_quota() {
        let manager = manager_with(JobsConfig {
            rate_limit_max: 1,
            rate_limit_window_secs: 3600,
            ..Default::default()
        });
        let err = manager
            .submit(ScanRequest {
                caller: "alice".to_string(),
                range: range(),
                universe: SymbolUniverse::List(vec![]),
                pattern_source: "up = close > open".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));
        // The rejected submission neither holds a slot nor caller quota
        assert_eq!(manager.running_count().await, 0);
        manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_panicking_chunk_reports_its_index() {
        struct PanickyProvider {
            inner: StaticBarProvider,
        }
        #[async_trait]
        impl BarProvider for PanickyProvider {
            async fn fetch(
                &self,
                symbol: &str,
                range: DateRange,
            ) -> Result<Vec<BarRecord>, DataQualityError> {
                if symbol == "BOOM" {
                    panic!("provider bug");
                }
                self.inner.fetch(symbol, range).await
            }
            async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
                Ok(vec!["AAPL".to_string(), "BOOM".to_string()])
            }
        }

        let manager = ScanJobManager::new(
            JobsConfig {
                symbols_per_chunk: 1, // BOOM lands in chunk 1
                ..Default::default()
            },
            ScanConfig::default(),
            Arc::new(PanickyProvider {
                inner: StaticBarProvider::new(vec![bar("AAPL", 2, 9.0, 11.0, 2_000_000.0)]),
            }),
        );
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        let snapshot = wait_terminal(&manager, id).await;
        assert_eq!(snapshot.status, JobStatus::Failed);
        let error = snapshot.error.as_deref().unwrap();
        assert!(error.contains("chunk 1"), "error was: {error}");
        assert!(error.contains("panicked"));
        // The healthy chunk's signal survives
        assert_eq!(snapshot.results.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_symbol_universe_entry_warns() {
        let manager = manager_with(JobsConfig::default());
        let id = manager
            .submit(ScanRequest {
                caller: "alice".to_string(),
                range: range(),
                universe: SymbolUniverse::List(vec!["AAPL".into(), "NOPE".into()]),
                pattern_source: "up = close > open".to_string(),
            })
            .await
            .unwrap();
        let snapshot = wait_terminal(&manager, id).await;
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert!(snapshot.warnings.iter().any(|w| w.contains("NOPE")));
        assert!(!snapshot.results.is_empty());
    }

    #[tokio::test]
    async fn test_chunk_failure_retains_other_chunk_results() {
        // Provider that fails hard for one symbol only
        struct HalfBrokenProvider {
            inner: StaticBarProvider,
        }
        #[async_trait]
        impl BarProvider for HalfBrokenProvider {
            async fn fetch(
                &self,
                symbol: &str,
                range: DateRange,
            ) -> Result<Vec<BarRecord>, DataQualityError> {
                if symbol == "BROKEN" {
                    return Err(DataQualityError::ProviderFailure {
                        symbol: symbol.to_string(),
                        reason: "connection reset".to_string(),
                    });
                }
                self.inner.fetch(symbol, range).await
            }
            async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
                Ok(vec!["AAPL".to_string(), "BROKEN".to_string()])
            }
        }

        let provider = HalfBrokenProvider {
            inner: StaticBarProvider::new(vec![bar("AAPL", 2, 9.0, 11.0, 2_000_000.0)]),
        };
        let manager = ScanJobManager::new(
            JobsConfig {
                symbols_per_chunk: 1, // AAPL and BROKEN land in separate chunks
                ..Default::default()
            },
            ScanConfig::default(),
            Arc::new(provider),
        );
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        let snapshot = wait_terminal(&manager, id).await;
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert!(snapshot.error.as_deref().unwrap().contains("BROKEN"));
        // The healthy chunk's signal survives
        assert_eq!(snapshot.results.len(), 1);
        assert_eq!(snapshot.results[0].symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_cancel_transitions_to_cancelled() {
        struct StallProvider;
        #[async_trait]
        impl BarProvider for StallProvider {
            async fn fetch(
                &self,
                symbol: &str,
                _range: DateRange,
            ) -> Result<Vec<BarRecord>, DataQualityError> {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(vec![bar(symbol, 2, 9.0, 11.0, 2_000_000.0)])
            }
            async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
                Ok((0..50).map(|i| format!("S{i:02}")).collect())
            }
        }

        let manager = ScanJobManager::new(
            JobsConfig {
                symbols_per_chunk: 50,
                ..Default::default()
            },
            ScanConfig::default(),
            Arc::new(StallProvider),
        );
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.cancel(id).await);
        let snapshot = wait_terminal(&manager, id).await;
        assert_eq!(snapshot.status, JobStatus::Cancelled);
        assert_eq!(snapshot.error.as_deref(), Some("cancelled by request"));
    }

    #[tokio::test]
    async fn test_job_timeout_cancels_with_reason() {
        struct StallProvider;
        #[async_trait]
        impl BarProvider for StallProvider {
            async fn fetch(
                &self,
                symbol: &str,
                _range: DateRange,
            ) -> Result<Vec<BarRecord>, DataQualityError> {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(vec![bar(symbol, 2, 9.0, 11.0, 2_000_000.0)])
            }
            async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
                Ok((0..20).map(|i| format!("S{i:02}")).collect())
            }
        }

        let manager = ScanJobManager::new(
            JobsConfig {
                job_timeout_secs: 1,
                fetch_timeout_secs: 10,
                symbols_per_chunk: 20,
                ..Default::default()
            },
            ScanConfig::default(),
            Arc::new(StallProvider),
        );
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        let snapshot = wait_terminal(&manager, id).await;
        assert_eq!(snapshot.status, JobStatus::Cancelled);
        assert!(snapshot.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_eviction_after_retention() {
        let manager = manager_with(JobsConfig {
            retention_secs: 0,
            ..Default::default()
        });
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        wait_terminal(&manager, id).await;
        manager.evict_expired().await;
        assert!(manager.status(id).await.is_none());
    }

    #[tokio::test]
    async fn test_running_job_never_evicted() {
        struct StallProvider;
        #[async_trait]
        impl BarProvider for StallProvider {
            async fn fetch(
                &self,
                symbol: &str,
                _range: DateRange,
            ) -> Result<Vec<BarRecord>, DataQualityError> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(vec![bar(symbol, 2, 9.0, 11.0, 2_000_000.0)])
            }
            async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
                Ok(vec!["A".to_string()])
            }
        }
        let manager = ScanJobManager::new(
            JobsConfig {
                retention_secs: 0,
                ..Default::default()
            },
            ScanConfig::default(),
            Arc::new(StallProvider),
        );
        let id = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap();
        manager.evict_expired().await;
        // Still running, still pollable
        assert!(manager.status(id).await.is_some());
        wait_terminal(&manager, id).await;
    }

    #[tokio::test]
    async fn test_empty_universe_rejected_and_slot_released() {
        let manager = ScanJobManager::new(
            JobsConfig::default(),
            ScanConfig::default(),
            Arc::new(StaticBarProvider::new(vec![])),
        );
        let err = manager
            .submit(request("alice", "up = close > open"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));
        assert_eq!(manager.running_count().await, 0);
    }
}
