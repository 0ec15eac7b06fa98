//! Tunable parameter extraction and classification
//!
//! Finds candidate tunables in uploaded scanner source by static analysis
//! and labels each as trading filter, infra config, or ambiguous.

mod classifier;
mod extractor;
mod types;

pub use classifier::{score_rules, Classifier, SecondaryClassifier, NEUTRAL_CONFIDENCE};
pub use extractor::extract_parameters;
pub use types::{ClassifiedParameter, Occurrence, ParamClass, ParameterCandidate};
