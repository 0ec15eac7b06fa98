//! Indicator types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::bars::BarRecord;

/// Base bar columns every pattern may reference
pub const BASE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Derived columns with fixed names (EMA columns are `ema_<span>`)
pub const DERIVED_COLUMNS: [&str; 8] = [
    "true_range",
    "atr",
    "gap",
    "gap_atr",
    "dollar_volume",
    "relative_volume",
    "highest_high",
    "lowest_low",
];

/// Windows and spans the engine must compute for a pattern set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// EMA spans referenced by the patterns (e.g. ema_9, ema_20)
    pub ema_spans: BTreeSet<u32>,
    /// ATR rolling period
    pub atr_period: usize,
    /// Trailing window for relative volume
    pub rel_volume_period: usize,
    /// Window for rolling highest high / lowest low
    pub rolling_window: usize,
}

impl Default for IndicatorSpec {
    fn default() -> Self {
        Self {
            ema_spans: BTreeSet::new(),
            atr_period: 14,
            rel_volume_period: 20,
            rolling_window: 20,
        }
    }
}

impl IndicatorSpec {
    /// Derive the EMA spans from the column names a pattern set references.
    /// Non-EMA columns are ignored; windows keep their configured defaults.
    pub fn from_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut spec = Self::default();
        for column in columns {
            if let Some(span) = parse_ema_column(column) {
                spec.ema_spans.insert(span);
            }
        }
        spec
    }

    /// All column names this spec makes available for pattern evaluation
    pub fn column_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = BASE_COLUMNS
            .iter()
            .chain(DERIVED_COLUMNS.iter())
            .map(|s| s.to_string())
            .collect();
        for span in &self.ema_spans {
            names.insert(format!("ema_{span}"));
        }
        names
    }
}

/// Parse `ema_<span>` column names, returning the span
pub fn parse_ema_column(name: &str) -> Option<u32> {
    let span = name.strip_prefix("ema_")?;
    span.parse().ok().filter(|s| *s > 0)
}

/// Whether a column name is recognized given the declared spec columns.
/// `ema_<span>` names validate structurally so a pattern can introduce a
/// span the spec has not seen yet.
pub fn is_known_column(name: &str) -> bool {
    BASE_COLUMNS.contains(&name)
        || DERIVED_COLUMNS.contains(&name)
        || parse_ema_column(name).is_some()
}

/// One bar augmented with derived indicator values.
/// `None` means "unavailable for this day" (insufficient history), which
/// excludes the row from evaluation of patterns that reference the column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// The underlying bar
    pub bar: BarRecord,
    /// EMA per requested span, seeded at the first observed close
    pub ema: BTreeMap<u32, f64>,
    /// True range; needs the previous close
    pub true_range: Option<f64>,
    /// Average true range over the ATR period
    pub atr: Option<f64>,
    /// (open - prev_close) / prev_close
    pub gap: Option<f64>,
    /// Gap in price units divided by ATR
    pub gap_atr: Option<f64>,
    /// close * volume
    pub dollar_volume: f64,
    /// volume / trailing average volume
    pub relative_volume: Option<f64>,
    /// Highest high over the rolling window (inclusive of today)
    pub highest_high: Option<f64>,
    /// Lowest low over the rolling window (inclusive of today)
    pub lowest_low: Option<f64>,
}

impl IndicatorRow {
    /// Look up a column value by canonical name; `None` when the column is
    /// unavailable for this row or unknown.
    pub fn get(&self, column: &str) -> Option<f64> {
        match column {
            "open" => Some(self.bar.open),
            "high" => Some(self.bar.high),
            "low" => Some(self.bar.low),
            "close" => Some(self.bar.close),
            "volume" => Some(self.bar.volume),
            "dollar_volume" => Some(self.dollar_volume),
            "true_range" => self.true_range,
            "atr" => self.atr,
            "gap" => self.gap,
            "gap_atr" => self.gap_atr,
            "relative_volume" => self.relative_volume,
            "highest_high" => self.highest_high,
            "lowest_low" => self.lowest_low,
            _ => parse_ema_column(column).and_then(|span| self.ema.get(&span).copied()),
        }
    }
}
