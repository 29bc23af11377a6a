//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, loosest first:
//!
//! ```text
//! or      := and (("or" | "||") and)*
//! and     := cmp (("and" | "&&") cmp)*
//! cmp     := unary (("==" | "!=" | "<" | "<=" | ">" | ">=" | eq | ne | lt | le | gt | ge) unary)*
//! unary   := ("not" | "!" | "-") unary | postfix
//! postfix := primary ("." ident call? | "?." ident call? | "[" or "]")*
//! primary := literal | "#" ident | ident | "(" or ")"
//! ```

use super::lexer::{Spanned, Token, tokenize};
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Variable(String),
    Field {
        target: Box<Expr>,
        name: String,
        null_safe: bool,
    },
    Call {
        target: Box<Expr>,
        name: String,
        null_safe: bool,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Reserved words that never resolve to variables.
pub(crate) const KEYWORDS: &[&str] = &[
    "and", "or", "not", "eq", "ne", "lt", "le", "gt", "ge", "true", "false", "null",
];

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

pub(crate) fn parse(source: &str) -> EvalResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_or()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(extra) => Err(parser.error_at(
            extra.offset,
            format!("unexpected {}", extra.token.describe()),
        )),
    }
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, offset: usize, message: String) -> EvalError {
        EvalError::Parse {
            expression: self.source.to_string(),
            offset,
            message,
        }
    }

    fn error_here(&self, message: &str) -> EvalError {
        match self.tokens.get(self.pos) {
            Some(spanned) => self.error_at(
                spanned.offset,
                format!("{message}, found {}", spanned.token.describe()),
            ),
            None => self.error_at(self.source.len(), format!("{message}, found end of input")),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> EvalResult<()> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, message: &str) -> EvalResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here(message)),
        }
    }

    fn peek_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name.eq_ignore_ascii_case(word))
    }

    fn parse_or(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::OrOr)) || self.peek_word("or") {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        while matches!(self.peek(), Some(Token::AndAnd)) || self.peek_word("and") {
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::Ident(word) => match word.to_ascii_lowercase().as_str() {
                "eq" => Some(BinaryOp::Eq),
                "ne" => Some(BinaryOp::Ne),
                "lt" => Some(BinaryOp::Lt),
                "le" => Some(BinaryOp::Le),
                "gt" => Some(BinaryOp::Gt),
                "ge" => Some(BinaryOp::Ge),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.comparison_op() {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let op = match self.peek() {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("not") => Some(UnaryOp::Not),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) | Some(Token::SafeDot) => {
                    let null_safe = matches!(self.advance(), Some(Token::SafeDot));
                    let name = self.expect_ident("expected a property name")?;
                    if self.peek() == Some(&Token::LParen) {
                        self.pos += 1;
                        self.expect(Token::RParen, "`)`; only zero-argument calls are supported")?;
                        expr = Expr::Call {
                            target: Box::new(expr),
                            name,
                            null_safe,
                        };
                    } else {
                        expr = Expr::Field {
                            target: Box::new(expr),
                            name,
                            null_safe,
                        };
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_or()?;
                    self.expect(Token::RBracket, "`]`")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::from(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::from_f64(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Hash) => self
                .expect_ident("expected a variable name after `#`")
                .map(Expr::Variable),
            Some(Token::Ident(word)) => match word.to_ascii_lowercase().as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                _ if is_keyword(&word) => {
                    self.pos -= 1;
                    Err(self.error_here("expected an operand"))
                }
                _ => Ok(Expr::Variable(word)),
            },
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(_) => {
                self.pos -= 1;
                Err(self.error_here("expected an operand"))
            }
            None => Err(self.error_here("expected an operand")),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_then_field() {
        let expr = parse("#args[0].name").unwrap();
        assert_eq!(
            expr,
            Expr::Field {
                target: Box::new(Expr::Index {
                    target: Box::new(Expr::Variable("args".into())),
                    index: Box::new(Expr::Literal(Value::from(0i64))),
                }),
                name: "name".into(),
                null_safe: false,
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a or b and c").unwrap();
        let Expr::Binary { op, rhs, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_word_operators() {
        let expr = parse("#args[0] gt 5").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Gt, .. }));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(matches!(parse("#a #b"), Err(EvalError::Parse { offset: 3, .. })));
    }

    #[test]
    fn test_calls_take_no_arguments() {
        assert!(parse("#result.size()").is_ok());
        assert!(parse("#result.get(1)").is_err());
    }
}
