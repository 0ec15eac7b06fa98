//! Bar data types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single daily OHLCV bar for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    /// Trading symbol (e.g., "AAPL")
    pub symbol: String,
    /// Trading date
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Session high
    pub high: f64,
    /// Session low
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Share volume
    pub volume: f64,
}

impl BarRecord {
    /// Check structural validity: high must bound open/close from above,
    /// low from below, volume non-negative, all fields finite.
    pub fn is_valid(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite();
        finite
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.volume >= 0.0
    }
}

/// Inclusive date range for a scan or fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range; `start` must not be after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Whether a date falls within the range (inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Errors from the bar data layer
#[derive(Debug, Clone, Error)]
pub enum DataQualityError {
    /// Provider could not supply the requested symbol
    #[error("no bar data for symbol {0}")]
    SymbolUnavailable(String),

    /// Provider call failed (I/O, parse, transport)
    #[error("bar provider failure for {symbol}: {reason}")]
    ProviderFailure { symbol: String, reason: String },

    /// Too many malformed bars; the symbol is dropped for this run
    #[error("symbol {symbol} skipped: {malformed} of {total} bars malformed")]
    TooManyMalformed {
        symbol: String,
        malformed: usize,
        total: usize,
    },
}

/// Filter out malformed bars, returning kept bars and the malformed count.
/// Input ordering is preserved; bars are never repaired in place.
pub fn filter_malformed(bars: Vec<BarRecord>) -> (Vec<BarRecord>, usize) {
    let total = bars.len();
    let kept: Vec<BarRecord> = bars.into_iter().filter(BarRecord::is_valid).collect();
    let malformed = total - kept.len();
    (kept, malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: f64) -> BarRecord {
        BarRecord {
            symbol: "TEST".to_string(),
            date: date("2024-01-02"),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn test_valid_bar() {
        assert!(bar(10.0, 11.0, 9.5, 10.5, 1000.0).is_valid());
    }

    #[test]
    fn test_high_below_close_invalid() {
        assert!(!bar(10.0, 10.2, 9.5, 10.5, 1000.0).is_valid());
    }

    #[test]
    fn test_low_above_open_invalid() {
        assert!(!bar(10.0, 11.0, 10.1, 10.5, 1000.0).is_valid());
    }

    #[test]
    fn test_negative_volume_invalid() {
        assert!(!bar(10.0, 11.0, 9.5, 10.5, -1.0).is_valid());
    }

    #[test]
    fn test_nan_invalid() {
        assert!(!bar(f64::NAN, 11.0, 9.5, 10.5, 1000.0).is_valid());
    }

    #[test]
    fn test_filter_malformed_counts() {
        let bars = vec![
            bar(10.0, 11.0, 9.5, 10.5, 1000.0),
            bar(10.0, 10.2, 9.5, 10.5, 1000.0), // high below close
            bar(10.0, 11.0, 9.5, 10.5, 2000.0),
        ];
        let (kept, malformed) = filter_malformed(bars);
        assert_eq!(kept.len(), 2);
        assert_eq!(malformed, 1);
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(DateRange::new(date("2024-02-01"), date("2024-01-01")).is_none());
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let range = DateRange::new(date("2024-01-01"), date("2024-01-10")).unwrap();
        assert!(range.contains(date("2024-01-01")));
        assert!(range.contains(date("2024-01-10")));
        assert!(!range.contains(date("2024-01-11")));
        assert_eq!(range.num_days(), 10);
    }
}
