//! Pattern normalization
//!
//! Takes raw pattern-logic blocks out of uploaded scanner source, rewrites
//! every column-reference variant (`df['close']`, `row.close`, bare
//! `close`) into the canonical bare-identifier form, parses them under the
//! restricted grammar, and validates every referenced column. This is the
//! safety boundary: uploaded text never executes, it only ever becomes a
//! validated [`Expr`].

use std::collections::BTreeMap;

use crate::indicators::is_known_column;

use super::lexer::{lex, Token};
use super::parser::{parse_expr, ParseError};
use super::types::{BinaryOp, Expr, PatternDefinition, PatternError, UnaryOp, Value};

/// Default category for patterns outside any `# category:` section
pub const DEFAULT_CATEGORY: &str = "general";

/// A named pattern block lifted out of scanner source, pre-normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawPattern {
    pub name: String,
    pub category: String,
    pub text: String,
}

/// Split scanner source into named pattern blocks.
///
/// A pattern is a `name = <expression>` or `name: <expression>` line whose
/// right-hand side is more than a bare literal; literal bindings are
/// parameter candidates and belong to the extractor, not the normalizer.
/// `# category: <label>` comment lines set the category for the patterns
/// that follow.
pub fn split_blocks(source: &str) -> Vec<RawPattern> {
    let mut blocks = Vec::new();
    let mut category = DEFAULT_CATEGORY.to_string();

    for line in source.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix('#') {
            if let Some(label) = rest.trim().strip_prefix("category:") {
                let label = label.trim();
                if !label.is_empty() {
                    category = label.to_string();
                }
            }
            continue;
        }
        let Ok(tokens) = lex(trimmed) else { continue };
        let Some((name, rhs)) = binding_parts(&tokens) else {
            continue;
        };
        if is_bare_literal(rhs) {
            continue;
        }
        // Re-render the RHS text from the original line so parse errors
        // point at what the user wrote.
        let text = trimmed
            .splitn(2, ['=', ':'])
            .nth(1)
            .unwrap_or_default()
            .trim()
            .trim_end_matches(',')
            .trim()
            .to_string();
        blocks.push(RawPattern {
            name,
            category: category.clone(),
            text,
        });
    }

    blocks
}

/// Match `name = ...`, `name: ...`, or `"name": ...` bindings
fn binding_parts(tokens: &[Token]) -> Option<(String, &[Token])> {
    match tokens {
        [Token::Ident(name), Token::Assign | Token::Colon, rest @ ..] if !rest.is_empty() => {
            Some((name.clone(), rest))
        }
        [Token::Str(name), Token::Colon, rest @ ..] if !rest.is_empty() => {
            Some((name.clone(), rest))
        }
        _ => None,
    }
}

/// Whether a token slice is a single (possibly negated or trailing-comma)
/// literal, i.e. a parameter binding rather than a pattern
fn is_bare_literal(tokens: &[Token]) -> bool {
    let tokens = match tokens {
        [rest @ .., Token::Comma] => rest,
        rest => rest,
    };
    matches!(
        tokens,
        [Token::Number(_)]
            | [Token::Minus, Token::Number(_)]
            | [Token::Bool(_)]
            | [Token::Str(_)]
    )
}

/// Collapse column-reference syntax variants into bare identifiers:
/// `frame [ 'col' ]` and `frame . col` both become `col`. Method-call
/// shapes (`x.shift(...)`) are left alone so the parser rejects them as
/// disallowed constructs rather than mangling them first.
pub fn canonicalize_tokens(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        match (
            tokens.get(i),
            tokens.get(i + 1),
            tokens.get(i + 2),
            tokens.get(i + 3),
        ) {
            (
                Some(Token::Ident(_)),
                Some(Token::LBracket),
                Some(Token::Str(col)),
                Some(Token::RBracket),
            ) => {
                out.push(Token::Ident(col.clone()));
                i += 4;
            }
            (Some(Token::Ident(_)), Some(Token::Dot), Some(Token::Ident(col)), next) => {
                if next == Some(&Token::LParen) {
                    // method call; let the parser refuse it
                    out.push(tokens[i].clone());
                    i += 1;
                } else {
                    out.push(Token::Ident(col.clone()));
                    i += 3;
                }
            }
            _ => {
                out.push(tokens[i].clone());
                i += 1;
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ty {
    Num,
    Bool,
}

/// Infer the expression's type, rejecting operand mismatches
fn infer(expr: &Expr) -> Result<Ty, String> {
    match expr {
        Expr::Literal(Value::Number(_)) => Ok(Ty::Num),
        Expr::Literal(Value::Bool(_)) => Ok(Ty::Bool),
        Expr::Column(_) => Ok(Ty::Num),
        Expr::Unary { op: UnaryOp::Neg, expr } => match infer(expr)? {
            Ty::Num => Ok(Ty::Num),
            Ty::Bool => Err("cannot negate a boolean".to_string()),
        },
        Expr::Unary { op: UnaryOp::Not, expr } => match infer(expr)? {
            Ty::Bool => Ok(Ty::Bool),
            Ty::Num => Err("'not' requires a boolean operand".to_string()),
        },
        Expr::Binary { op, lhs, rhs } => {
            let (l, r) = (infer(lhs)?, infer(rhs)?);
            match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    if l == Ty::Num && r == Ty::Num {
                        Ok(Ty::Num)
                    } else {
                        Err(format!("arithmetic '{op}' requires numeric operands"))
                    }
                }
                BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => {
                    if l == Ty::Num && r == Ty::Num {
                        Ok(Ty::Bool)
                    } else {
                        Err(format!("comparison '{op}' requires numeric operands"))
                    }
                }
                BinaryOp::Eq => {
                    if l == r {
                        Ok(Ty::Bool)
                    } else {
                        Err("'==' requires operands of the same type".to_string())
                    }
                }
                BinaryOp::And | BinaryOp::Or => {
                    if l == Ty::Bool && r == Ty::Bool {
                        Ok(Ty::Bool)
                    } else {
                        Err(format!("'{op}' requires boolean operands"))
                    }
                }
            }
        }
    }
}

/// Normalize one raw pattern block into a validated definition
pub fn normalize_block(raw: &RawPattern) -> Result<PatternDefinition, PatternError> {
    let tokens = lex(&raw.text).map_err(|message| PatternError::Parse {
        pattern: raw.name.clone(),
        message,
    })?;
    let tokens = canonicalize_tokens(tokens);
    let expr = parse_expr(&tokens).map_err(|e| match e {
        ParseError::Disallowed(construct) => PatternError::DisallowedConstruct {
            pattern: raw.name.clone(),
            construct,
        },
        ParseError::Malformed(message) => PatternError::Parse {
            pattern: raw.name.clone(),
            message,
        },
    })?;

    for column in expr.columns() {
        if !is_known_column(&column) {
            return Err(PatternError::UnknownColumn {
                pattern: raw.name.clone(),
                column,
            });
        }
    }

    match infer(&expr) {
        Ok(Ty::Bool) => {}
        Ok(Ty::Num) => {
            return Err(PatternError::NotBoolean {
                pattern: raw.name.clone(),
            })
        }
        Err(message) => {
            return Err(PatternError::Parse {
                pattern: raw.name.clone(),
                message,
            })
        }
    }

    Ok(PatternDefinition {
        name: raw.name.clone(),
        expr,
        category: raw.category.clone(),
    })
}

/// Normalize a full scanner source into its validated pattern set.
///
/// Duplicate names keep the last definition (logged). Source with no
/// pattern blocks at all fails with [`PatternError::Empty`]; any invalid
/// block fails the whole set, so a job never runs a partial pattern list.
pub fn normalize_source(source: &str) -> Result<Vec<PatternDefinition>, PatternError> {
    let blocks = split_blocks(source);
    if blocks.is_empty() {
        return Err(PatternError::Empty);
    }

    let mut by_name: BTreeMap<String, usize> = BTreeMap::new();
    let mut patterns: Vec<PatternDefinition> = Vec::new();
    for raw in &blocks {
        let definition = normalize_block(raw)?;
        match by_name.get(&definition.name) {
            Some(&idx) => {
                tracing::warn!(pattern = %definition.name, "duplicate pattern definition, last one wins");
                patterns[idx] = definition;
            }
            None => {
                by_name.insert(definition.name.clone(), patterns.len());
                patterns.push(definition);
            }
        }
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_blocks_skips_literal_bindings() {
        let source = "\
min_volume = 1000000
gap_up = gap >= 0.02 and volume >= min_volume
";
        let blocks = split_blocks(source);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "gap_up");
    }

    #[test]
    fn test_split_blocks_category_sections() {
        let source = "\
# category: momentum
breakout = close > highest_high
# category: mean_reversion
washout = close < lowest_low
";
        let blocks = split_blocks(source);
        assert_eq!(blocks[0].category, "momentum");
        assert_eq!(blocks[1].category, "mean_reversion");
    }

    #[test]
    fn test_split_blocks_mapping_syntax() {
        let source = "\"gap_up\": gap >= 0.02,";
        let blocks = split_blocks(source);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "gap_up");
    }

    #[test]
    fn test_canonicalize_subscript() {
        let tokens = canonicalize_tokens(lex("df['close'] > df[\"open\"]").unwrap());
        assert_eq!(
            tokens,
            vec![
                Token::Ident("close".into()),
                Token::Gt,
                Token::Ident("open".into()),
            ]
        );
    }

    #[test]
    fn test_canonicalize_attribute() {
        let tokens = canonicalize_tokens(lex("row.close > bar.open").unwrap());
        assert_eq!(
            tokens,
            vec![
                Token::Ident("close".into()),
                Token::Gt,
                Token::Ident("open".into()),
            ]
        );
    }

    #[test]
    fn test_method_call_left_for_parser() {
        let raw = RawPattern {
            name: "bad".into(),
            category: DEFAULT_CATEGORY.into(),
            text: "close.shift(1) > open".into(),
        };
        let err = normalize_block(&raw).unwrap_err();
        assert!(matches!(err, PatternError::DisallowedConstruct { .. }));
    }

    #[test]
    fn test_normalize_valid_pattern() {
        let patterns =
            normalize_source("gap_up = df['gap'] >= 0.02 and volume >= 1000000").unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].expr.columns(), vec!["gap", "volume"]);
    }

    #[test]
    fn test_unknown_column_names_pattern_and_column() {
        let err = normalize_source("weird = foo_bar > 10").unwrap_err();
        assert_eq!(
            err,
            PatternError::UnknownColumn {
                pattern: "weird".into(),
                column: "foo_bar".into(),
            }
        );
        assert!(err.to_string().contains("weird"));
        assert!(err.to_string().contains("foo_bar"));
    }

    #[test]
    fn test_function_call_fails_closed() {
        let err = normalize_source("evil = exec(close)").unwrap_err();
        match err {
            PatternError::DisallowedConstruct { pattern, construct } => {
                assert_eq!(pattern, "evil");
                assert!(construct.contains("function call"));
            }
            other => panic!("expected disallowed construct, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_pattern_rejected() {
        let err = normalize_source("price = close + 1").unwrap_err();
        assert!(matches!(err, PatternError::NotBoolean { .. }));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = normalize_source("odd = (close > open) + 1").unwrap_err();
        assert!(matches!(err, PatternError::Parse { .. }));
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(
            normalize_source("# just a comment\n"),
            Err(PatternError::Empty)
        );
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let patterns = normalize_source("p = close > open\np = close < open").unwrap();
        assert_eq!(patterns.len(), 1);
        assert!(matches!(
            patterns[0].expr,
            Expr::Binary { op: BinaryOp::Lt, .. }
        ));
    }

    #[test]
    fn test_ema_column_validates() {
        let patterns = normalize_source("trend = close > ema_20").unwrap();
        assert_eq!(patterns[0].expr.columns(), vec!["close", "ema_20"]);
    }
}
