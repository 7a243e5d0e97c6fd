//! Path-expression parser
//!
//! Recursive descent over the token stream. The accepted grammar is the
//! subset the invariant layer emits:
//!
//! ```text
//! query     := step+
//! step      := ("//" | "/") name predicate*
//! predicate := "[" number "]"
//!            | "[" attr ("and" attr)* "]"
//! attr      := "@" name "=" literal
//! ```
//!
//! Literal values carry the baseline escapes `&quot;` (for `"`) and
//! `&47;` (for `/`); the parser unescapes them so comparison against
//! document attribute values is exact.

use crate::error::QueryError;

use super::lexer::{tokenize, Token};

/// A parsed path query
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuery {
    pub steps: Vec<Step>,
}

/// One step of a path query
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NameTest,
    pub predicates: Vec<Predicate>,
}

/// Axis of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `//name`: any descendant
    Descendant,
    /// `/name`: direct child
    Child,
}

/// Element name test
#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    /// `*`: any element
    Any,
    /// Specific tag name
    Name(String),
}

impl NameTest {
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Name(name) => name == tag,
        }
    }
}

/// A step predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `[n]`: 1-based position among same-tag siblings
    Position(usize),
    /// `[@k="v" and ...]`: all listed attributes must match exactly
    Attributes(Vec<(String, String)>),
}

/// Parse a path expression into a query
pub fn parse(input: &str) -> Result<PathQuery, QueryError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_query()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), QueryError> {
        let token = self.advance();
        if &token == expected {
            Ok(())
        } else {
            Err(QueryError::new(format!(
                "expected {expected:?}, found {token:?}"
            )))
        }
    }

    fn parse_query(&mut self) -> Result<PathQuery, QueryError> {
        let mut steps = Vec::new();
        loop {
            match self.peek() {
                Token::DoubleSlash | Token::Slash => steps.push(self.parse_step()?),
                Token::Eof => break,
                other => {
                    return Err(QueryError::new(format!(
                        "expected `/` or `//`, found {other:?}"
                    )))
                }
            }
        }
        if steps.is_empty() {
            return Err(QueryError::new("empty expression"));
        }
        Ok(PathQuery { steps })
    }

    fn parse_step(&mut self) -> Result<Step, QueryError> {
        let axis = match self.advance() {
            Token::DoubleSlash => Axis::Descendant,
            Token::Slash => Axis::Child,
            token => return Err(QueryError::new(format!("expected step, found {token:?}"))),
        };

        let test = match self.advance() {
            Token::Name(name) if name == "*" => NameTest::Any,
            Token::Name(name) => NameTest::Name(name),
            token => {
                return Err(QueryError::new(format!(
                    "expected element name, found {token:?}"
                )))
            }
        };

        let mut predicates = Vec::new();
        while self.peek() == &Token::LBracket {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate, QueryError> {
        self.expect(&Token::LBracket)?;
        let predicate = match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                if n == 0 {
                    return Err(QueryError::new("positions are 1-based"));
                }
                Predicate::Position(n)
            }
            Token::At => {
                let mut pairs = Vec::new();
                loop {
                    self.expect(&Token::At)?;
                    let name = match self.advance() {
                        Token::Name(name) => name,
                        token => {
                            return Err(QueryError::new(format!(
                                "expected attribute name, found {token:?}"
                            )))
                        }
                    };
                    self.expect(&Token::Eq)?;
                    let value = match self.advance() {
                        Token::Literal(value) => unescape_value(&value),
                        token => {
                            return Err(QueryError::new(format!(
                                "expected string literal, found {token:?}"
                            )))
                        }
                    };
                    pairs.push((name, value));
                    if self.peek() == &Token::And {
                        self.advance();
                    } else {
                        break;
                    }
                }
                Predicate::Attributes(pairs)
            }
            token => {
                return Err(QueryError::new(format!(
                    "expected predicate, found {token:?}"
                )))
            }
        };
        self.expect(&Token::RBracket)?;
        Ok(predicate)
    }
}

/// Reverse the escapes applied when deriving expressions from attribute
/// values
fn unescape_value(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&47;", "/")
}
