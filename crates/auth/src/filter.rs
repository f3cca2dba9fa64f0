//! LDAP-style attribute filters used by role searches.
//!
//! ```text
//! filter := '(' ( '&' filter+ | '|' filter+ | '!' filter | item ) ')'
//! item   := key ( '=' | '~=' | '>=' | '<=' ) value
//! ```
//!
//! `(key=*)` tests presence, other unescaped `*` in an `=` value are substring
//! wildcards, and `\` escapes the next character. Keys match attribute keys
//! case-insensitively; only text attributes take part in value comparisons.

use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

use useradmin_core::{AttributeValue, UserAdminError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid filter at offset {position}: {message}")]
pub struct FilterError {
    pub position: usize,
    pub message: String,
}

impl From<FilterError> for UserAdminError {
    fn from(value: FilterError) -> Self {
        UserAdminError::invalid_argument(value.to_string())
    }
}

/// Value side of an `=` comparison, split on unescaped `*`.
///
/// A single piece is an exact match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePattern {
    pieces: Vec<String>,
}

impl ValuePattern {
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            pieces: vec![value.into()],
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let [first, middle @ .., last] = self.pieces.as_slice() else {
            return self.pieces.first().is_some_and(|only| only == text);
        };

        let Some(mut rest) = text.strip_prefix(first.as_str()) else {
            return false;
        };
        for piece in middle {
            match rest.find(piece.as_str()) {
                Some(at) => rest = &rest[at + piece.len()..],
                None => return false,
            }
        }
        rest.ends_with(last.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equal { key: String, pattern: ValuePattern },
    Approx { key: String, value: String },
    GreaterEq { key: String, value: String },
    LessEq { key: String, value: String },
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
        };
        let filter = parser.filter()?;
        parser.skip_ws();
        if parser.pos != parser.chars.len() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(filter)
    }

    pub fn matches(&self, attributes: &HashMap<String, AttributeValue>) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(attributes)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(attributes)),
            Filter::Not(filter) => !filter.matches(attributes),
            Filter::Present(key) => lookup(attributes, key).is_some(),
            Filter::Equal { key, pattern } => {
                text(attributes, key).is_some_and(|t| pattern.matches(t))
            }
            Filter::Approx { key, value } => {
                text(attributes, key).is_some_and(|t| normalize(t) == normalize(value))
            }
            Filter::GreaterEq { key, value } => text(attributes, key).is_some_and(|t| t >= value.as_str()),
            Filter::LessEq { key, value } => text(attributes, key).is_some_and(|t| t <= value.as_str()),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn lookup<'m>(attributes: &'m HashMap<String, AttributeValue>, key: &str) -> Option<&'m AttributeValue> {
    attributes.get(key).or_else(|| {
        attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn text<'m>(attributes: &'m HashMap<String, AttributeValue>, key: &str) -> Option<&'m str> {
    lookup(attributes, key).and_then(AttributeValue::as_text)
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), FilterError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn filter(&mut self) -> Result<Filter, FilterError> {
        self.skip_ws();
        self.expect('(')?;
        self.skip_ws();

        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };

        self.skip_ws();
        self.expect(')')?;
        Ok(filter)
    }

    fn list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut filters = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() != Some('(') {
                break;
            }
            filters.push(self.filter()?);
        }
        if filters.is_empty() {
            return Err(self.error("operator needs at least one operand"));
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter, FilterError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '>' | '<' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let key: String = self.chars[start..self.pos].iter().collect::<String>().trim().to_string();
        if key.is_empty() {
            return Err(self.error("missing attribute key"));
        }

        let op = match self.peek() {
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(c @ ('~' | '>' | '<')) => {
                self.pos += 1;
                self.expect('=')?;
                c
            }
            _ => return Err(self.error("expected comparison operator")),
        };

        let (pieces, raw_star_only) = self.value()?;

        Ok(match op {
            '=' if raw_star_only => Filter::Present(key),
            '=' => Filter::Equal {
                key,
                pattern: ValuePattern { pieces },
            },
            '~' => Filter::Approx {
                key,
                value: pieces.concat(),
            },
            '>' => Filter::GreaterEq {
                key,
                value: pieces.concat(),
            },
            _ => Filter::LessEq {
                key,
                value: pieces.concat(),
            },
        })
    }

    /// Read a value up to the closing parenthesis, splitting on unescaped `*`.
    ///
    /// Also reports whether the value was exactly one unescaped `*`.
    fn value(&mut self) -> Result<(Vec<String>, bool), FilterError> {
        let mut pieces = vec![String::new()];
        let mut raw_len = 0usize;
        let mut stars = 0usize;

        while let Some(c) = self.peek() {
            match c {
                ')' => break,
                '(' => return Err(self.error("unescaped '(' in value")),
                '\\' => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    if let Some(last) = pieces.last_mut() {
                        last.push(escaped);
                    }
                }
                '*' => {
                    stars += 1;
                    pieces.push(String::new());
                }
                other => {
                    if let Some(last) = pieces.last_mut() {
                        last.push(other);
                    }
                }
            }
            raw_len += 1;
            self.pos += 1;
        }

        Ok((pieces, stars == 1 && raw_len == 1))
    }
}
