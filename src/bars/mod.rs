//! Historical bar data
//!
//! Bar records, validity filtering, and the provider boundary used by
//! scan jobs to fetch per-symbol history.

mod csv;
mod provider;
mod types;

pub use csv::CsvBarProvider;
pub use provider::{BarProvider, StaticBarProvider};
pub use types::{filter_malformed, BarRecord, DataQualityError, DateRange};
