//! Domain-level errors (no external dependencies)

use itertools::Itertools;
use thiserror::Error;

/// A raw string could not be converted into the declared value type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {type_name} value {input:?}: {reason}")]
pub struct ParseError {
    pub type_name: String,
    pub input: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(type_name: &str, input: &str, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.to_string(),
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A value was parsed but rejected by a validation predicate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of `Value::set`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A token claimed to be query, form or JSON but does not decode as such.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid URL escape {0:?}")]
    Escape(String),

    #[error("invalid semicolon separator in query")]
    Semicolon,

    #[error("unterminated {quote} quote in form argument {input:?}")]
    UnterminatedQuote { quote: char, input: String },

    #[error("invalid JSON format: {0}")]
    Json(String),
}

/// One problem found while initializing the command tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("duplicate command name: {0}")]
    DuplicateCommand(String),

    #[error("command {command}: option must have a Flag or Env field")]
    UnnamedOption { command: String },
}

/// Fatal tree configuration problems, aggregated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("initializing command: {}", .issues.iter().join("; "))]
pub struct ConfigError {
    pub issues: Vec<ConfigIssue>,
}
