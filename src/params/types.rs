//! Parameter extraction and classification types

use serde::{Deserialize, Serialize};

use crate::pattern::Value;

/// One binding site of a candidate, kept for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// 1-based source line
    pub line: usize,
    /// Literal bound at this site
    pub value: Value,
}

/// A tunable value found in scanner source.
/// `value` reflects the latest binding; `occurrences` retains every one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterCandidate {
    /// Bound name
    pub name: String,
    /// Current (last-bound) literal value
    pub value: Value,
    /// Trimmed source line around the first binding
    pub context: String,
    /// First-seen order within the extraction pass
    pub order: usize,
    /// Every binding site in source order
    pub occurrences: Vec<Occurrence>,
}

/// Classification outcome for a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamClass {
    /// A trading threshold the user would tune (price, volume, gap, ...)
    TradingFilter,
    /// Plumbing configuration (timeouts, batch sizes, paths, ...)
    InfraConfig,
    /// Neither pass could decide; surfaced for human review
    Ambiguous,
}

/// Candidate plus class and confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedParameter {
    pub candidate: ParameterCandidate,
    pub class: ParamClass,
    pub confidence: f64,
}
