//! Indicator computation
//!
//! Pure single-pass computation of derived columns over one symbol's
//! date-ordered bars. Rows with insufficient history carry `None` for the
//! affected columns rather than a filled-in zero.

use std::collections::BTreeMap;

use crate::bars::{filter_malformed, BarRecord, DataQualityError};

use super::types::{IndicatorRow, IndicatorSpec};

/// Result of one indicator pass over one symbol
#[derive(Debug, Clone)]
pub struct SymbolIndicators {
    /// Derived rows, date ascending
    pub rows: Vec<IndicatorRow>,
    /// Malformed bars dropped before computation
    pub malformed: usize,
}

/// Compute indicator rows for one symbol.
///
/// Bars are validity-filtered first; if the malformed fraction exceeds
/// `max_malformed_fraction` the whole symbol is rejected so a scan can
/// surface it as a data-quality warning instead of producing signals from
/// suspect history.
pub fn compute_symbol(
    symbol: &str,
    bars: Vec<BarRecord>,
    spec: &IndicatorSpec,
    max_malformed_fraction: f64,
) -> Result<SymbolIndicators, DataQualityError> {
    let total = bars.len();
    let (kept, malformed) = filter_malformed(bars);
    if total > 0 && (malformed as f64) / (total as f64) > max_malformed_fraction {
        return Err(DataQualityError::TooManyMalformed {
            symbol: symbol.to_string(),
            malformed,
            total,
        });
    }
    Ok(SymbolIndicators {
        rows: compute_rows(&kept, spec),
        malformed,
    })
}

/// Compute derived rows over already-validated, date-ordered bars
pub fn compute_rows(bars: &[BarRecord], spec: &IndicatorSpec) -> Vec<IndicatorRow> {
    let mut rows = Vec::with_capacity(bars.len());

    // EMA state per span, seeded at the first observed close
    let mut ema_state: BTreeMap<u32, f64> = BTreeMap::new();
    // Trailing true ranges for ATR
    let mut true_ranges: Vec<f64> = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let prev_close = if i > 0 { Some(bars[i - 1].close) } else { None };

        let true_range = prev_close.map(|pc| {
            (bar.high - bar.low)
                .max((bar.high - pc).abs())
                .max((bar.low - pc).abs())
        });
        if let Some(tr) = true_range {
            true_ranges.push(tr);
        }

        // ATR(N): mean of the N most recent true ranges; unavailable until
        // N true-range observations exist.
        let atr = if true_ranges.len() >= spec.atr_period && spec.atr_period > 0 {
            let window = &true_ranges[true_ranges.len() - spec.atr_period..];
            Some(window.iter().sum::<f64>() / spec.atr_period as f64)
        } else {
            None
        };

        let gap = prev_close.and_then(|pc| {
            if pc != 0.0 {
                Some((bar.open - pc) / pc)
            } else {
                None
            }
        });
        let gap_atr = match (prev_close, atr) {
            (Some(pc), Some(atr)) if atr != 0.0 => Some((bar.open - pc) / atr),
            _ => None,
        };

        let mut ema = BTreeMap::new();
        for &span in &spec.ema_spans {
            let multiplier = 2.0 / (span as f64 + 1.0);
            let value = match ema_state.get(&span) {
                Some(prev) => (bar.close - prev) * multiplier + prev,
                None => bar.close,
            };
            ema_state.insert(span, value);
            ema.insert(span, value);
        }

        // Relative volume: today's volume over the average of the previous
        // M days, excluding today.
        let relative_volume = if i >= spec.rel_volume_period && spec.rel_volume_period > 0 {
            let window = &bars[i - spec.rel_volume_period..i];
            let avg = window.iter().map(|b| b.volume).sum::<f64>()
                / spec.rel_volume_period as f64;
            if avg > 0.0 {
                Some(bar.volume / avg)
            } else {
                None
            }
        } else {
            None
        };

        // Rolling extremes over the window ending today
        let (highest_high, lowest_low) = if spec.rolling_window > 0
            && i + 1 >= spec.rolling_window
        {
            let window = &bars[i + 1 - spec.rolling_window..=i];
            let hh = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let ll = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            (Some(hh), Some(ll))
        } else {
            (None, None)
        };

        rows.push(IndicatorRow {
            bar: bar.clone(),
            ema,
            true_range,
            atr,
            gap,
            gap_atr,
            dollar_volume: bar.close * bar.volume,
            relative_volume,
            highest_high,
            lowest_low,
        });
    }

    rows
}
