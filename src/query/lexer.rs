//! Path-expression lexer
//!
//! Tokenizes invariant path expressions such as
//! `//div[2][@id="main" and @class="header"]`. Leading whitespace
//! (including the tab depth prefix of serialized baselines) is skipped.

use crate::error::QueryError;

/// Token types produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `//` (descendant step)
    DoubleSlash,
    /// `/` (child step)
    Slash,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `@`
    At,
    /// `=`
    Eq,
    /// `and` keyword inside a predicate
    And,
    /// Name (tag or attribute name)
    Name(String),
    /// Positional index
    Number(usize),
    /// Quoted string literal
    Literal(String),
    /// End of input
    Eof,
}

/// Tokenize a path expression
pub fn tokenize(input: &str) -> Result<Vec<Token>, QueryError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '/' => {
                if chars.get(pos + 1) == Some(&'/') {
                    tokens.push(Token::DoubleSlash);
                    pos += 2;
                } else {
                    tokens.push(Token::Slash);
                    pos += 1;
                }
            }
            '[' => {
                tokens.push(Token::LBracket);
                pos += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                pos += 1;
            }
            '@' => {
                tokens.push(Token::At);
                pos += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Name("*".into()));
                pos += 1;
            }
            '"' | '\'' => {
                let quote = c;
                pos += 1;
                let start = pos;
                while pos < chars.len() && chars[pos] != quote {
                    pos += 1;
                }
                if pos >= chars.len() {
                    return Err(QueryError::new("unterminated string literal"));
                }
                let literal: String = chars[start..pos].iter().collect();
                tokens.push(Token::Literal(literal));
                pos += 1;
            }
            c if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let n = text
                    .parse::<usize>()
                    .map_err(|_| QueryError::new(format!("invalid number `{text}`")))?;
                tokens.push(Token::Number(n));
            }
            c if is_name_char(c) => {
                let start = pos;
                while pos < chars.len() && is_name_char(chars[pos]) {
                    pos += 1;
                }
                let name: String = chars[start..pos].iter().collect();
                if name == "and" {
                    tokens.push(Token::And);
                } else {
                    tokens.push(Token::Name(name));
                }
            }
            _ => {
                return Err(QueryError::new(format!("unexpected character `{c}`")));
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':'
}
