//! Rule expression parser.
//!
//! # Grammar
//! ```text
//! rule      := condition ( "&&" condition )*
//! condition := identifier "(" literal ")"
//! literal   := "'" any-char-but-quote* "'"
//! ```
//!
//! Identifiers are `Host`, `Path` and `PathPrefix`. Literals are single-quoted
//! only; double quotes are rejected. Whitespace between tokens is ignored.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::routing::matcher::{strip_port, AndMatcher, HostMatcher, Matcher, PathMatcher, PathPrefixMatcher};

/// Errors produced while parsing a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule is empty")]
    Empty,

    #[error("unknown matcher '{0}'")]
    UnknownMatcher(String),

    #[error("double-quoted literal at offset {0}, literals must use single quotes")]
    DoubleQuoted(usize),

    #[error("unterminated literal starting at offset {0}")]
    UnterminatedLiteral(usize),

    #[error("expected {expected} at offset {offset}")]
    Expected { expected: &'static str, offset: usize },

    #[error("{0} requires a non-empty literal")]
    EmptyLiteral(MatcherKind),

    #[error("{kind} literal '{literal}' must start with '/'")]
    RelativePath { kind: MatcherKind, literal: String },

    #[error("Host literal '{0}' must not carry a port")]
    HostWithPort(String),

    #[error("unexpected input at offset {0}")]
    Trailing(usize),
}

/// Known matcher identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherKind {
    Host,
    Path,
    PathPrefix,
}

impl MatcherKind {
    pub const ALL: [MatcherKind; 3] = [MatcherKind::Host, MatcherKind::Path, MatcherKind::PathPrefix];

    pub fn identifier(self) -> &'static str {
        match self {
            MatcherKind::Host => "Host",
            MatcherKind::Path => "Path",
            MatcherKind::PathPrefix => "PathPrefix",
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.identifier() == identifier)
    }

    fn condition(self, literal: &str) -> Result<Condition, RuleError> {
        if literal.is_empty() {
            return Err(RuleError::EmptyLiteral(self));
        }
        match self {
            // Request ports are ignored when matching, so a port here could never match.
            MatcherKind::Host if strip_port(literal) != literal => {
                Err(RuleError::HostWithPort(literal.to_string()))
            }
            MatcherKind::Host => Ok(Condition::Host(literal.to_string())),
            MatcherKind::Path | MatcherKind::PathPrefix if !literal.starts_with('/') => {
                Err(RuleError::RelativePath {
                    kind: self,
                    literal: literal.to_string(),
                })
            }
            MatcherKind::Path => Ok(Condition::Path(literal.to_string())),
            MatcherKind::PathPrefix => Ok(Condition::PathPrefix(literal.to_string())),
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// A single `Identifier('literal')` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Host(String),
    Path(String),
    PathPrefix(String),
}

impl Condition {
    pub fn kind(&self) -> MatcherKind {
        match self {
            Condition::Host(_) => MatcherKind::Host,
            Condition::Path(_) => MatcherKind::Path,
            Condition::PathPrefix(_) => MatcherKind::PathPrefix,
        }
    }

    pub fn literal(&self) -> &str {
        match self {
            Condition::Host(v) | Condition::Path(v) | Condition::PathPrefix(v) => v,
        }
    }

    fn to_matcher(&self) -> Box<dyn Matcher> {
        match self {
            Condition::Host(host) => Box::new(HostMatcher::new(host.as_str())),
            Condition::Path(path) => Box::new(PathMatcher::new(path.as_str())),
            Condition::PathPrefix(prefix) => Box::new(PathPrefixMatcher::new(prefix.as_str())),
        }
    }
}

/// A parsed rule: one or more conditions that must all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    conditions: Vec<Condition>,
}

impl Rule {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Total literal length; longer rules are more specific.
    pub fn specificity(&self) -> usize {
        self.conditions.iter().map(|c| c.literal().len()).sum()
    }

    /// Build the request matcher for this rule.
    pub fn to_matcher(&self) -> Box<dyn Matcher> {
        match self.conditions.as_slice() {
            [single] => single.to_matcher(),
            many => Box::new(AndMatcher::new(many.iter().map(Condition::to_matcher).collect())),
        }
    }
}

impl FromStr for Rule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).rule()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" && ")?;
            }
            write!(f, "{}('{}')", condition.kind(), condition.literal())?;
        }
        Ok(())
    }
}

/// Parse a rule expression.
pub fn parse_rule(input: &str) -> Result<Rule, RuleError> {
    input.parse()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), RuleError> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(RuleError::Expected {
                expected,
                offset: self.pos,
            })
        }
    }

    fn identifier(&mut self) -> Result<&'a str, RuleError> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(RuleError::Expected {
                expected: "matcher name",
                offset: start,
            });
        }
        Ok(&self.src[start..self.pos])
    }

    fn literal(&mut self) -> Result<&'a str, RuleError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(b'\'') => {}
            Some(b'"') => return Err(RuleError::DoubleQuoted(start)),
            _ => {
                return Err(RuleError::Expected {
                    expected: "quoted literal",
                    offset: start,
                })
            }
        }
        let body = &self.src[start + 1..];
        let len = body
            .find('\'')
            .ok_or(RuleError::UnterminatedLiteral(start))?;
        self.pos = start + 1 + len + 1;
        Ok(&body[..len])
    }

    fn condition(&mut self) -> Result<Condition, RuleError> {
        let identifier = self.identifier()?;
        let kind = MatcherKind::from_identifier(identifier)
            .ok_or_else(|| RuleError::UnknownMatcher(identifier.to_string()))?;
        self.expect(b'(', "'('")?;
        let literal = self.literal()?;
        self.expect(b')', "')'")?;
        kind.condition(literal)
    }

    fn rule(mut self) -> Result<Rule, RuleError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(RuleError::Empty);
        }

        let mut conditions = vec![self.condition()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(b'&') if self.src[self.pos..].starts_with("&&") => {
                    self.pos += 2;
                    conditions.push(self.condition()?);
                }
                Some(_) => return Err(RuleError::Trailing(self.pos)),
            }
        }

        Ok(Rule { conditions })
    }
}
