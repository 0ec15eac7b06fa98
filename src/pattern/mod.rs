//! Pattern normalization and evaluation
//!
//! Uploaded scanner text is normalized into a restricted-grammar AST and
//! interpreted against indicator rows; arbitrary code execution is never
//! reachable from here.

mod eval;
pub(crate) mod lexer;
mod normalizer;
mod parser;
mod types;

pub use eval::{eval_expr, evaluate, EvaluationOutput};
pub use normalizer::{
    canonicalize_tokens, normalize_block, normalize_source, split_blocks, RawPattern,
    DEFAULT_CATEGORY,
};
pub use parser::{parse_expr, ParseError};
pub use types::{
    BinaryOp, Expr, PatternDefinition, PatternError, SignalRecord, UnaryOp, Value,
};
