//! Bar provider trait and in-memory implementation

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::types::{BarRecord, DataQualityError, DateRange};

/// Source of historical bars, called per symbol and date range.
/// Implementations must return bars ordered by date ascending.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch bars for one symbol within the range (inclusive)
    async fn fetch(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<BarRecord>, DataQualityError>;

    /// List all symbols the provider can serve, sorted ascending
    async fn symbols(&self) -> Result<Vec<String>, DataQualityError>;
}

/// In-memory provider backed by pre-loaded bars, used in tests and demos
#[derive(Debug, Default)]
pub struct StaticBarProvider {
    bars: BTreeMap<String, Vec<BarRecord>>,
}

impl StaticBarProvider {
    /// Build from a flat bar list; bars are grouped by symbol and sorted by date
    pub fn new(mut bars: Vec<BarRecord>) -> Self {
        bars.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        let mut grouped: BTreeMap<String, Vec<BarRecord>> = BTreeMap::new();
        for bar in bars {
            grouped.entry(bar.symbol.clone()).or_default().push(bar);
        }
        Self { bars: grouped }
    }
}

#[async_trait]
impl BarProvider for StaticBarProvider {
    async fn fetch(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<BarRecord>, DataQualityError> {
        let bars = self
            .bars
            .get(symbol)
            .ok_or_else(|| DataQualityError::SymbolUnavailable(symbol.to_string()))?;
        Ok(bars
            .iter()
            .filter(|b| range.contains(b.date))
            .cloned()
            .collect())
    }

    async fn symbols(&self) -> Result<Vec<String>, DataQualityError> {
        Ok(self.bars.keys().cloned().collect())
    }
}
