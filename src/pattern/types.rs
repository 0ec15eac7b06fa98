//! Pattern types and errors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A typed value produced by expression evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Unary operators of the restricted grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Boolean negation (`not`)
    Not,
    /// Arithmetic negation (`-`)
    Neg,
}

/// Binary operators of the restricted grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    And,
    Or,
}

impl BinaryOp {
    /// Whether the operator compares two numbers into a boolean
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Eq
        )
    }

    /// Whether the operator combines two booleans
    pub fn is_boolean(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        f.write_str(s)
    }
}

/// Expression AST of the restricted pattern grammar.
/// Untrusted scanner text only ever becomes one of these variants; there
/// is no call, assignment, or loop node, so evaluation cannot reach
/// arbitrary code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric or boolean literal
    Literal(Value),
    /// Canonical bare-identifier column reference
    Column(String),
    /// Unary application
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Binary application
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Collect every referenced column name, sorted and deduplicated
    pub fn columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(name) => out.push(name.clone()),
            Expr::Unary { expr, .. } => expr.collect_columns(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
        }
    }
}

/// A validated, immutable pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Pattern name from the scanner source
    pub name: String,
    /// Canonical boolean expression
    pub expr: Expr,
    /// Category label from the enclosing source section
    pub category: String,
}

/// One evaluation match: a (symbol, date) row with the patterns it hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub symbol: String,
    pub date: NaiveDate,
    /// Matched pattern names, sorted ascending
    pub matched: Vec<String>,
    /// Fraction of the active pattern set matched on this row
    pub score: Option<f64>,
}

/// Fatal pattern-definition errors, surfaced before job execution
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("unknown column in pattern {pattern}: {column}")]
    UnknownColumn { pattern: String, column: String },

    #[error("disallowed construct in pattern {pattern}: {construct}")]
    DisallowedConstruct { pattern: String, construct: String },

    #[error("parse error in pattern {pattern}: {message}")]
    Parse { pattern: String, message: String },

    #[error("pattern {pattern} does not evaluate to a boolean")]
    NotBoolean { pattern: String },

    #[error("no pattern definitions found in scanner source")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_sorted_and_deduped() {
        let expr = Expr::Binary {
            op: BinaryOp::And,
            lhs: Box::new(Expr::Binary {
                op: BinaryOp::Gt,
                lhs: Box::new(Expr::Column("close".into())),
                rhs: Box::new(Expr::Column("open".into())),
            }),
            rhs: Box::new(Expr::Binary {
                op: BinaryOp::Ge,
                lhs: Box::new(Expr::Column("close".into())),
                rhs: Box::new(Expr::Literal(Value::Number(10.0))),
            }),
        };
        assert_eq!(expr.columns(), vec!["close", "open"]);
    }

    #[test]
    fn test_error_messages_name_pattern_and_column() {
        let err = PatternError::UnknownColumn {
            pattern: "gap_up".into(),
            column: "foo_bar".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gap_up"));
        assert!(msg.contains("foo_bar"));
    }

    #[test]
    fn test_binary_op_classes() {
        assert!(BinaryOp::Ge.is_comparison());
        assert!(!BinaryOp::Ge.is_boolean());
        assert!(BinaryOp::And.is_boolean());
        assert!(!BinaryOp::Add.is_comparison());
    }
}
