//! Recursive-descent parser for the restricted pattern grammar
//!
//! Grammar (lowest to highest precedence):
//!   or_expr   := and_expr ("or" and_expr)*
//!   and_expr  := not_expr ("and" not_expr)*
//!   not_expr  := "not" not_expr | cmp_expr
//!   cmp_expr  := add_expr (("<" | "<=" | ">" | ">=" | "==") add_expr)?
//!   add_expr  := mul_expr (("+" | "-") mul_expr)*
//!   mul_expr  := unary (("*" | "/") unary)*
//!   unary     := "-" unary | atom
//!   atom      := number | bool | identifier | "(" or_expr ")"
//!
//! Everything outside this grammar fails closed as a disallowed
//! construct. In particular an identifier followed by `(` is rejected as
//! a function call, and `=` / `!=` are rejected as constructs rather than
//! parse noise, so untrusted scanner text gets a precise refusal.

use super::lexer::Token;
use super::types::{BinaryOp, Expr, UnaryOp, Value};

/// Parser outcome distinguishing "malformed" from "well-formed but banned"
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Input does not fit the grammar
    Malformed(String),
    /// Input uses a construct the grammar deliberately excludes
    Disallowed(String),
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete expression, requiring all tokens to be consumed
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.or_expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(tok) => Err(self.reject(tok.clone())),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Classify a stray token: known-but-banned tokens get the disallowed
    /// error so the caller can report the safety boundary precisely.
    fn reject(&self, tok: Token) -> ParseError {
        match tok {
            Token::Assign => ParseError::Disallowed("assignment '='".to_string()),
            Token::NotEq => ParseError::Disallowed("operator '!='".to_string()),
            Token::LBracket | Token::RBracket | Token::Dot => ParseError::Disallowed(
                "non-canonical column reference".to_string(),
            ),
            Token::Comma => ParseError::Disallowed("tuple or argument list".to_string()),
            Token::Colon => ParseError::Disallowed("mapping entry".to_string()),
            Token::Str(s) => ParseError::Disallowed(format!("string literal \"{s}\"")),
            other => ParseError::Malformed(format!("unexpected token '{other}'")),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.not_expr()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let expr = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.cmp_expr()
    }

    fn cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.add_expr()?;
        let op = match self.peek() {
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => {
                return Err(ParseError::Disallowed("operator '!='".to_string()))
            }
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.add_expr()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.mul_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.mul_expr()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Value::Bool(b))),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    return Err(ParseError::Disallowed(format!("function call '{name}(...)'")));
                }
                Ok(Expr::Column(name))
            }
            Some(Token::LParen) => {
                let expr = self.or_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    Some(tok) => Err(self.reject(tok)),
                    None => Err(ParseError::Malformed("unclosed parenthesis".to_string())),
                }
            }
            Some(tok) => Err(self.reject(tok)),
            None => Err(ParseError::Malformed("unexpected end of expression".to_string())),
        }
    }
}

/// Parse one tokenized expression
pub fn parse_expr(tokens: &[Token]) -> Result<Expr, ParseError> {
    Parser::new(tokens).parse()
}
