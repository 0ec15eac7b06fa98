//! Technical indicator engine
//!
//! Derives EMA, ATR, gap, volume, and rolling-extreme columns from raw
//! bars. Computation is a pure function of its input window.

mod engine;
mod types;

pub use engine::{compute_rows, compute_symbol, SymbolIndicators};
pub use types::{
    is_known_column, parse_ema_column, IndicatorRow, IndicatorSpec, BASE_COLUMNS,
    DERIVED_COLUMNS,
};
