//! Pattern evaluation over indicator rows
//!
//! Interprets validated pattern ASTs against typed row contexts. Rows
//! missing any column the active pattern set references are excluded and
//! counted, never evaluated against a zero. Output ordering is date
//! ascending then symbol ascending, so identical inputs always produce an
//! identical signal sequence.

use std::collections::BTreeSet;

use crate::indicators::IndicatorRow;

use super::types::{BinaryOp, Expr, PatternDefinition, SignalRecord, UnaryOp, Value};

/// Output of one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutput {
    /// Signals ordered by (date, symbol)
    pub signals: Vec<SignalRecord>,
    /// Rows excluded because a referenced column was unavailable
    pub skipped_rows: usize,
}

/// Evaluate one expression against one row.
///
/// Returns `None` if a referenced column is unavailable on this row.
/// Division follows IEEE semantics; comparisons with non-finite values
/// are simply false, keeping the result total and deterministic.
pub fn eval_expr(expr: &Expr, row: &IndicatorRow) -> Option<Value> {
    match expr {
        Expr::Literal(v) => Some(*v),
        Expr::Column(name) => row.get(name).map(Value::Number),
        Expr::Unary { op, expr } => {
            let v = eval_expr(expr, row)?;
            match (op, v) {
                (UnaryOp::Neg, Value::Number(n)) => Some(Value::Number(-n)),
                (UnaryOp::Not, Value::Bool(b)) => Some(Value::Bool(!b)),
                // Unreachable after normalization type-checking
                _ => None,
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval_expr(lhs, row)?;
            let r = eval_expr(rhs, row)?;
            match (op, l, r) {
                (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Some(Value::Number(a + b)),
                (BinaryOp::Sub, Value::Number(a), Value::Number(b)) => Some(Value::Number(a - b)),
                (BinaryOp::Mul, Value::Number(a), Value::Number(b)) => Some(Value::Number(a * b)),
                (BinaryOp::Div, Value::Number(a), Value::Number(b)) => Some(Value::Number(a / b)),
                (BinaryOp::Gt, Value::Number(a), Value::Number(b)) => Some(Value::Bool(a > b)),
                (BinaryOp::Ge, Value::Number(a), Value::Number(b)) => Some(Value::Bool(a >= b)),
                (BinaryOp::Lt, Value::Number(a), Value::Number(b)) => Some(Value::Bool(a < b)),
                (BinaryOp::Le, Value::Number(a), Value::Number(b)) => Some(Value::Bool(a <= b)),
                (BinaryOp::Eq, Value::Number(a), Value::Number(b)) => Some(Value::Bool(a == b)),
                (BinaryOp::Eq, Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a == b)),
                (BinaryOp::And, Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a && b)),
                (BinaryOp::Or, Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a || b)),
                _ => None,
            }
        }
    }
}

/// Evaluate a pattern set over a table of indicator rows.
///
/// A row participates only when every column referenced by any pattern in
/// the set is available on it; partially-warmed rows are counted in
/// `skipped_rows`. One [`SignalRecord`] is emitted per participating row
/// with a non-empty match set.
pub fn evaluate(rows: &[IndicatorRow], patterns: &[PatternDefinition]) -> EvaluationOutput {
    let required: BTreeSet<String> = patterns
        .iter()
        .flat_map(|p| p.expr.columns())
        .collect();

    let mut signals = Vec::new();
    let mut skipped_rows = 0usize;

    for row in rows {
        if required.iter().any(|col| row.get(col).is_none()) {
            skipped_rows += 1;
            continue;
        }

        let mut matched: Vec<String> = patterns
            .iter()
            .filter(|p| eval_expr(&p.expr, row) == Some(Value::Bool(true)))
            .map(|p| p.name.clone())
            .collect();

        if !matched.is_empty() {
            matched.sort();
            let score = matched.len() as f64 / patterns.len() as f64;
            signals.push(SignalRecord {
                symbol: row.bar.symbol.clone(),
                date: row.bar.date,
                matched,
                score: Some(score),
            });
        }
    }

    signals.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));

    EvaluationOutput {
        signals,
        skipped_rows,
    }
}
