//! Chunk planning and execution
//!
//! A job is decomposed into ordered symbol batches over the full date
//! range. Date ranges are not split across chunks so indicator warm-up
//! (EMA seeding, ATR history) always sees a symbol's whole window and
//! results stay independent of chunking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::bars::{BarProvider, DataQualityError, DateRange};
use crate::indicators::{compute_symbol, IndicatorSpec};
use crate::pattern::{evaluate, PatternDefinition, SignalRecord};

use super::types::ChunkExecutionError;

/// One unit of job decomposition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Position within the job's chunk sequence
    pub index: usize,
    /// Symbols this chunk evaluates
    pub symbols: Vec<String>,
    /// Full job date range
    pub range: DateRange,
}

/// Split a symbol list into ordered chunks of at most `symbols_per_chunk`
pub fn plan_chunks(symbols: &[String], range: DateRange, symbols_per_chunk: usize) -> Vec<ChunkSpec> {
    let per = symbols_per_chunk.max(1);
    symbols
        .chunks(per)
        .enumerate()
        .map(|(index, batch)| ChunkSpec {
            index,
            symbols: batch.to_vec(),
            range,
        })
        .collect()
}

/// Everything one chunk produced
#[derive(Debug, Clone, Default)]
pub struct ChunkOutcome {
    /// Signals from this chunk's symbols
    pub signals: Vec<SignalRecord>,
    /// Non-fatal per-symbol warnings
    pub warnings: Vec<String>,
    /// Rows excluded from evaluation for missing indicator history
    pub skipped_rows: usize,
}

/// Execute one chunk: fetch, validate, derive indicators, evaluate.
///
/// Per-symbol data-quality problems (unknown symbol, excess malformed
/// bars) become warnings and the symbol is skipped; provider failures and
/// fetch timeouts fail the whole chunk. The cancel flag is honored
/// between symbols, so an in-flight symbol finishes before the chunk
/// stops. Sub-progress (0-100) is reported through `progress` after each
/// symbol.
#[allow(clippy::too_many_arguments)]
pub async fn run_chunk(
    chunk: &ChunkSpec,
    provider: &dyn BarProvider,
    patterns: &[PatternDefinition],
    spec: &IndicatorSpec,
    max_malformed_fraction: f64,
    fetch_timeout: Duration,
    cancel: &AtomicBool,
    progress: &mpsc::UnboundedSender<(usize, f64)>,
) -> Result<ChunkOutcome, ChunkExecutionError> {
    let mut outcome = ChunkOutcome::default();
    let total = chunk.symbols.len().max(1);

    for (done, symbol) in chunk.symbols.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            tracing::debug!(chunk = chunk.index, "chunk stopping on cancellation");
            break;
        }

        let fetched = tokio::time::timeout(fetch_timeout, provider.fetch(symbol, chunk.range)).await;
        let bars = match fetched {
            Err(_) => {
                return Err(ChunkExecutionError::FetchTimeout {
                    chunk: chunk.index,
                    symbol: symbol.clone(),
                })
            }
            Ok(Err(DataQualityError::SymbolUnavailable(s))) => {
                outcome.warnings.push(format!("symbol {s} unavailable, skipped"));
                report(progress, chunk.index, done + 1, total);
                continue;
            }
            Ok(Err(DataQualityError::ProviderFailure { symbol, reason })) => {
                return Err(ChunkExecutionError::Provider {
                    chunk: chunk.index,
                    symbol,
                    reason,
                })
            }
            Ok(Err(err @ DataQualityError::TooManyMalformed { .. })) => {
                outcome.warnings.push(err.to_string());
                report(progress, chunk.index, done + 1, total);
                continue;
            }
            Ok(Ok(bars)) => bars,
        };

        match compute_symbol(symbol, bars, spec, max_malformed_fraction) {
            Err(err) => outcome.warnings.push(err.to_string()),
            Ok(indicators) => {
                if indicators.malformed > 0 {
                    outcome.warnings.push(format!(
                        "symbol {symbol}: dropped {} malformed bars",
                        indicators.malformed
                    ));
                }
                let evaluated = evaluate(&indicators.rows, patterns);
                outcome.skipped_rows += evaluated.skipped_rows;
                outcome.signals.extend(evaluated.signals);
            }
        }

        report(progress, chunk.index, done + 1, total);
    }

    Ok(outcome)
}

fn report(progress: &mpsc::UnboundedSender<(usize, f64)>, chunk: usize, done: usize, total: usize) {
    let pct = (done as f64 / total as f64) * 100.0;
    // Receiver gone means the job is already winding down
    let _ = progress.send((chunk, pct));
}
