//! Tokenizer for the expression grammar.

use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Hash,
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    SafeDot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Minus,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::Str(_) => "string literal".to_string(),
            Token::Int(_) | Token::Float(_) => "number".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Hash => "#",
            Token::Dot => ".",
            Token::SafeDot => "?.",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::Minus => "-",
            Token::Ident(_) | Token::Str(_) | Token::Int(_) | Token::Float(_) => "",
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

pub(crate) fn tokenize(source: &str) -> EvalResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    let error = |offset: usize, message: String| EvalError::Parse {
        expression: source.to_string(),
        offset,
        message,
    };

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match ch {
            '#' => {
                chars.next();
                Token::Hash
            }
            '.' => {
                chars.next();
                Token::Dot
            }
            '[' => {
                chars.next();
                Token::LBracket
            }
            ']' => {
                chars.next();
                Token::RBracket
            }
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '-' => {
                chars.next();
                Token::Minus
            }
            '?' => {
                chars.next();
                match chars.next() {
                    Some((_, '.')) => Token::SafeDot,
                    _ => return Err(error(offset, "expected `.` after `?`".into())),
                }
            }
            '=' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) => Token::Eq,
                    _ => return Err(error(offset, "expected `==`".into())),
                }
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    Token::Ne
                } else {
                    Token::Bang
                }
            }
            '<' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                chars.next();
                match chars.next() {
                    Some((_, '&')) => Token::AndAnd,
                    _ => return Err(error(offset, "expected `&&`".into())),
                }
            }
            '|' => {
                chars.next();
                match chars.next() {
                    Some((_, '|')) => Token::OrOr,
                    _ => return Err(error(offset, "expected `||`".into())),
                }
            }
            '\'' | '"' => {
                chars.next();
                let quote = ch;
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == quote {
                        // A doubled quote is an escaped quote.
                        if matches!(chars.peek(), Some((_, next)) if *next == quote) {
                            chars.next();
                            text.push(quote);
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    text.push(c);
                }
                if !closed {
                    return Err(error(offset, "unterminated string literal".into()));
                }
                Token::Str(text)
            }
            c if c.is_ascii_digit() => {
                let mut end = offset;
                let mut is_float = false;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        end = i + 1;
                        chars.next();
                    } else if c == '.' && !is_float {
                        // Only a decimal point when a digit follows.
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if matches!(lookahead.peek(), Some((_, d)) if d.is_ascii_digit()) {
                            is_float = true;
                            end = i + 1;
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                let text = &source[offset..end];
                if is_float {
                    text.parse::<f64>()
                        .map(Token::Float)
                        .map_err(|e| error(offset, e.to_string()))?
                } else {
                    match text.parse::<i64>() {
                        Ok(n) => Token::Int(n),
                        Err(_) => text
                            .parse::<f64>()
                            .map(Token::Float)
                            .map_err(|e| error(offset, e.to_string()))?,
                    }
                }
            }
            c if is_ident_start(c) => {
                let mut end = offset;
                while let Some(&(i, c)) = chars.peek() {
                    if is_ident_continue(c) {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(source[offset..end].to_string())
            }
            other => return Err(error(offset, format!("unexpected character `{other}`"))),
        };

        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenize_access_chain() {
        assert_eq!(
            kinds("#args[0]?.name"),
            vec![
                Token::Hash,
                Token::Ident("args".into()),
                Token::LBracket,
                Token::Int(0),
                Token::RBracket,
                Token::SafeDot,
                Token::Ident("name".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_literals_and_operators() {
        assert_eq!(
            kinds("'it''s' >= 1.5 != -2"),
            vec![
                Token::Str("it's".into()),
                Token::Ge,
                Token::Float(1.5),
                Token::Ne,
                Token::Minus,
                Token::Int(2),
            ]
        );
    }

    #[test]
    fn test_integer_followed_by_dot_is_not_float() {
        assert_eq!(
            kinds("1.size"),
            vec![Token::Int(1), Token::Dot, Token::Ident("size".into())]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            tokenize("'abc"),
            Err(EvalError::Parse { offset: 0, .. })
        ));
    }
}
