//! rulescan: Rule-based daily-bar market scanner
//!
//! This library provides the core components for:
//! - Loading and validating daily OHLCV bars
//! - Deriving the indicator columns pattern expressions reference
//! - Normalizing uploaded scanner text into a restricted expression AST
//! - Extracting and classifying tunable parameters from scanner source
//! - Evaluating pattern sets against indicator rows
//! - Managing concurrent scan jobs with admission control and progress
//! - Structured logging and metrics

pub mod bars;
pub mod cli;
pub mod config;
pub mod indicators;
pub mod jobs;
pub mod params;
pub mod pattern;
pub mod telemetry;
