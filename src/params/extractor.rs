//! Parameter extraction
//!
//! Structural walk over tokenized scanner source that collects every
//! numeric or boolean literal bound through assignment, mapping entry, or
//! comparison. The source is only ever lexed, never executed.

use std::collections::HashMap;

use crate::pattern::lexer::{lex, Token};
use crate::pattern::{canonicalize_tokens, Value};

use super::types::{Occurrence, ParameterCandidate};

const CONTEXT_MAX_CHARS: usize = 96;

/// Extract parameter candidates from scanner source.
///
/// Candidates appear in first-occurrence order; rebinding an existing name
/// updates its value in place and appends to its occurrence list. Running
/// extraction twice over identical source yields an identical list.
pub fn extract_parameters(source: &str) -> Vec<ParameterCandidate> {
    let mut candidates: Vec<ParameterCandidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (line_no, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        // Lines outside the scanner vocabulary carry no bindings we trust
        let Ok(tokens) = lex(trimmed) else { continue };
        let tokens = canonicalize_tokens(tokens);

        for (name, value) in bindings(&tokens) {
            record(
                &mut candidates,
                &mut index,
                name,
                value,
                trimmed,
                line_no + 1,
            );
        }
    }

    candidates
}

/// Walk a token line for `name = literal`, `name: literal`, and
/// `name <cmp> literal` shapes (either operand order for comparisons)
fn bindings(tokens: &[Token]) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let window = &tokens[i..];
        match window {
            [Token::Ident(name), Token::Assign | Token::Colon, rest @ ..]
            | [Token::Str(name), Token::Colon, rest @ ..] => {
                if let Some((value, used)) = leading_literal(rest) {
                    // Bare-literal RHS only; an expression RHS is a
                    // pattern definition and its thresholds are picked up
                    // by the comparison arm below.
                    let terminated = matches!(rest.get(used), None | Some(Token::Comma));
                    if terminated {
                        out.push((name.clone(), value));
                        i += 2 + used;
                        continue;
                    }
                }
                i += 2;
            }
            [Token::Ident(name), op, rest @ ..] if is_comparison(op) => {
                if let Some((value, used)) = leading_literal(rest) {
                    out.push((name.clone(), value));
                    i += 2 + used;
                } else {
                    i += 1;
                }
            }
            [Token::Number(n), op, Token::Ident(name), ..] if is_comparison(op) => {
                out.push((name.clone(), Value::Number(*n)));
                i += 3;
            }
            _ => i += 1,
        }
    }
    out
}

fn is_comparison(token: &Token) -> bool {
    matches!(
        token,
        Token::Gt | Token::Ge | Token::Lt | Token::Le | Token::EqEq
    )
}

/// Match a literal at the head of a token slice, returning it and the
/// number of tokens consumed
fn leading_literal(tokens: &[Token]) -> Option<(Value, usize)> {
    match tokens {
        [Token::Number(n), ..] => Some((Value::Number(*n), 1)),
        [Token::Minus, Token::Number(n), ..] => Some((Value::Number(-n), 2)),
        [Token::Bool(b), ..] => Some((Value::Bool(*b), 1)),
        _ => None,
    }
}

fn record(
    candidates: &mut Vec<ParameterCandidate>,
    index: &mut HashMap<String, usize>,
    name: String,
    value: Value,
    context: &str,
    line: usize,
) {
    let occurrence = Occurrence { line, value };
    match index.get(&name) {
        Some(&i) => {
            candidates[i].value = value;
            candidates[i].occurrences.push(occurrence);
        }
        None => {
            let order = candidates.len();
            index.insert(name.clone(), order);
            candidates.push(ParameterCandidate {
                name,
                value,
                context: snippet(context),
                order,
                occurrences: vec![occurrence],
            });
        }
    }
}

fn snippet(line: &str) -> String {
    if line.chars().count() <= CONTEXT_MAX_CHARS {
        line.to_string()
    } else {
        line.chars().take(CONTEXT_MAX_CHARS).collect()
    }
}
