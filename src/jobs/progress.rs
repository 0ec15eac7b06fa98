//! Monotonic progress aggregation
//!
//! The aggregator is the sole writer of a job's progress value. Chunk
//! updates feed a weighted mean; any update that would lower the
//! aggregate is discarded and logged, never applied, so a poller can only
//! ever observe a non-decreasing sequence.

/// Weighted, monotonic-clamp progress aggregator
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    /// Relative weight of each chunk (e.g. its symbol count)
    weights: Vec<f64>,
    /// Last applied per-chunk progress, 0-100
    chunk_progress: Vec<f64>,
    /// Current overall progress, 0-100, never decreases
    overall: f64,
}

impl ProgressAggregator {
    /// Create from per-chunk weights; zero or empty weights degenerate to
    /// equal weighting
    pub fn new(weights: Vec<f64>) -> Self {
        let weights = if weights.is_empty() || weights.iter().sum::<f64>() <= 0.0 {
            vec![1.0; weights.len().max(1)]
        } else {
            weights
        };
        let n = weights.len();
        Self {
            weights,
            chunk_progress: vec![0.0; n],
            overall: 0.0,
        }
    }

    /// Current overall progress
    pub fn overall(&self) -> f64 {
        self.overall
    }

    /// Apply one chunk update and return the new overall progress, or
    /// `None` if the update was discarded (out of range index, or it
    /// would have lowered the aggregate).
    pub fn update(&mut self, chunk: usize, sub_progress: f64) -> Option<f64> {
        if chunk >= self.chunk_progress.len() {
            tracing::warn!(chunk, "progress update for unknown chunk discarded");
            return None;
        }
        let clamped = sub_progress.clamp(0.0, 100.0);

        let mut tentative = self.chunk_progress.clone();
        tentative[chunk] = clamped;
        let total_weight: f64 = self.weights.iter().sum();
        let mean: f64 = tentative
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| p * w)
            .sum::<f64>()
            / total_weight;
        let candidate = mean.clamp(0.0, 100.0);

        if candidate < self.overall {
            tracing::warn!(
                chunk,
                sub_progress,
                overall = self.overall,
                "regressive progress update discarded"
            );
            return None;
        }

        self.chunk_progress = tentative;
        self.overall = candidate;
        Some(self.overall)
    }

    /// Mark every chunk complete (terminal aggregation convenience)
    pub fn complete(&mut self) -> f64 {
        for progress in &mut self.chunk_progress {
            *progress = 100.0;
        }
        self.overall = 100.0;
        self.overall
    }
}
