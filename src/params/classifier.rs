//! Parameter classification
//!
//! A deterministic rule-based pass labels each candidate from name and
//! context vocabulary. Candidates the rules leave uncertain can be handed
//! to a pluggable secondary classifier; without one they stay Ambiguous
//! at neutral confidence rather than being guessed.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::{ClassifiedParameter, ParamClass, ParameterCandidate};

/// Domain vocabulary that marks a trading-filter tunable
const TRADING_TERMS: [&str; 24] = [
    "price", "volume", "gap", "atr", "ema", "close", "open", "high", "low", "range",
    "breakout", "momentum", "liquidity", "dollar", "float", "change", "pct", "percent",
    "lookback", "period", "span", "window", "signal", "rvol",
];

/// Threshold-like verbs that strengthen either class but on their own
/// suggest a tunable filter
const THRESHOLD_TERMS: [&str; 7] = [
    "min", "max", "threshold", "limit", "above", "below", "cutoff",
];

/// Plumbing vocabulary that marks infrastructure config
const INFRA_TERMS: [&str; 18] = [
    "timeout", "retry", "retries", "worker", "workers", "thread", "batch", "chunk",
    "port", "host", "url", "path", "dir", "log", "level", "cache", "concurrency",
    "interval",
];

/// Neutral confidence assigned when nothing decides the class
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Optional second-stage classifier (e.g. a local model), consulted only
/// for candidates the rule-based pass scores below the ambiguity
/// threshold
#[async_trait]
pub trait SecondaryClassifier: Send + Sync {
    /// Classify one candidate by name and context
    async fn classify(&self, name: &str, context: &str) -> anyhow::Result<(ParamClass, f64)>;
}

/// Two-stage parameter classifier
pub struct Classifier {
    ambiguity_threshold: f64,
    secondary: Option<Arc<dyn SecondaryClassifier>>,
    /// Secondary results keyed by normalized (name, context hash) so
    /// repeated similar uploads classify without re-invoking the model
    cache: Mutex<HashMap<(String, u64), (ParamClass, f64)>>,
}

impl Classifier {
    /// Rule-based only; ambiguous candidates stay ambiguous
    pub fn rule_based(ambiguity_threshold: f64) -> Self {
        Self {
            ambiguity_threshold,
            secondary: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// With a secondary classifier for low-confidence candidates
    pub fn with_secondary(
        ambiguity_threshold: f64,
        secondary: Arc<dyn SecondaryClassifier>,
    ) -> Self {
        Self {
            ambiguity_threshold,
            secondary: Some(secondary),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Classify every candidate, preserving input order
    pub async fn classify_all(
        &self,
        candidates: Vec<ParameterCandidate>,
    ) -> Vec<ClassifiedParameter> {
        let mut out = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let (class, confidence) = self.classify_one(&candidate).await;
            out.push(ClassifiedParameter {
                candidate,
                class,
                confidence,
            });
        }
        out
    }

    async fn classify_one(&self, candidate: &ParameterCandidate) -> (ParamClass, f64) {
        let (class, confidence) = score_rules(&candidate.name, &candidate.context);
        if confidence >= self.ambiguity_threshold {
            return (class, confidence);
        }

        let Some(secondary) = &self.secondary else {
            return (ParamClass::Ambiguous, NEUTRAL_CONFIDENCE);
        };

        let key = cache_key(&candidate.name, &candidate.context);
        if let Some(&cached) = self.cache.lock().await.get(&key) {
            return cached;
        }

        match secondary.classify(&candidate.name, &candidate.context).await {
            Ok(result) => {
                self.cache.lock().await.insert(key, result);
                result
            }
            Err(e) => {
                tracing::warn!(name = %candidate.name, error = %e, "secondary classifier unavailable");
                (ParamClass::Ambiguous, NEUTRAL_CONFIDENCE)
            }
        }
    }
}

fn cache_key(name: &str, context: &str) -> (String, u64) {
    let mut hasher = DefaultHasher::new();
    context.trim().to_ascii_lowercase().hash(&mut hasher);
    (name.trim().to_ascii_lowercase(), hasher.finish())
}

/// Deterministic keyword scoring over name and context tokens
pub fn score_rules(name: &str, context: &str) -> (ParamClass, f64) {
    let name_tokens = word_tokens(name);
    let context_lower = context.to_ascii_lowercase();

    let mut trading = 0i32;
    let mut infra = 0i32;

    for token in &name_tokens {
        if TRADING_TERMS.contains(&token.as_str()) {
            trading += 2;
        }
        if INFRA_TERMS.contains(&token.as_str()) {
            infra += 2;
        }
        if THRESHOLD_TERMS.contains(&token.as_str()) {
            trading += 1;
        }
    }

    // Context signals
    for term in TRADING_TERMS {
        if context_lower.contains(term) {
            trading += 1;
            break;
        }
    }
    for term in INFRA_TERMS {
        if context_lower.contains(term) {
            infra += 1;
            break;
        }
    }
    // A nearby comparison reads as a filter threshold
    if context_lower.contains(">=")
        || context_lower.contains("<=")
        || context_lower.contains('>')
        || context_lower.contains('<')
    {
        trading += 1;
    }

    let diff = (trading - infra).abs() as f64;
    let confidence = (NEUTRAL_CONFIDENCE + 0.15 * diff).min(0.95);
    if trading > infra {
        (ParamClass::TradingFilter, confidence)
    } else if infra > trading {
        (ParamClass::InfraConfig, confidence)
    } else {
        (ParamClass::Ambiguous, NEUTRAL_CONFIDENCE)
    }
}

fn word_tokens(name: &str) -> Vec<String> {
    name.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
