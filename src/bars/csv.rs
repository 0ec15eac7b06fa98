//! CSV-backed bar provider
//!
//! Reads one CSV file per symbol from a data directory, e.g. `AAPL.csv`
//! with a `date,open,high,low,close,volume` header.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

use super::provider::BarProvider;
use super::types::{BarRecord, DataQualityError, DateRange};

/// One CSV row; symbol comes from the file name
#[derive(Debug, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Provider reading `<dir>/<SYMBOL>.csv` files
#[derive(Debug, Clone)]
pub struct CsvBarProvider {
    dir: PathBuf,
}

impl CsvBarProvider {
    /// Create a provider over a directory of per-symbol CSV files
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_symbol(&self, symbol: &str) -> Result<Vec<BarRecord>, DataQualityError> {
        let path = self.dir.join(format!("{symbol}.csv"));
        if !path.exists() {
            return Err(DataQualityError::SymbolUnavailable(symbol.to_string()));
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            DataQualityError::ProviderFailure {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            }
        })?;
        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvBar>() {
            let row = row.map_err(|e| DataQualityError::ProviderFailure {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;
            bars.push(BarRecord {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

#[async_trait]
impl BarProvider for CsvBarProvider {
    async fn fetch(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<BarRecord>, DataQualityError> {
        let bars = self.read_symbol(symbol)?;
        Ok(bars.into_iter().filter(|b| range.contains(b.date)).collect())
    }

    async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            DataQualityError::ProviderFailure {
                symbol: "*".to_string(),
                reason: e.to_string(),
            }
        })?;
        let mut symbols = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    symbols.push(stem.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}
