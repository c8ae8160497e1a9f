//! Application-level errors (wraps domain errors)

use std::io;

use thiserror::Error;

use crate::application::middleware::BoxError;
use crate::domain::{ConfigError, ValueError};

/// A single flag-parsing failure; parsing stops at the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("unknown flag: --{0}")]
    UnknownFlag(String),

    #[error("unknown shorthand flag: '{shorthand}' in {token}")]
    UnknownShorthand { shorthand: char, token: String },

    #[error("flag needs an argument: {0}")]
    MissingOperand(String),

    #[error("invalid argument {value:?} for \"--{flag}\" flag: {source}")]
    InvalidValue {
        flag: String,
        value: String,
        #[source]
        source: ValueError,
    },

    #[error("invalid default {value:?} for flag --{flag}: {source}")]
    InvalidDefault {
        flag: String,
        value: String,
        #[source]
        source: ValueError,
    },
}

/// Positional/structured argument binding failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("required argument {0:?} is missing")]
    Missing(String),

    #[error("setting value for arg {name:?}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: ValueError,
    },

    #[error("setting default value for {name:?}: {source}")]
    InvalidDefault {
        name: String,
        #[source]
        source: ValueError,
    },
}

/// Help was rendered but tokens were left that no subcommand claimed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown subcommand {:?}", .args.join(" "))]
pub struct UnknownSubcommandError {
    pub args: Vec<String>,
}

/// Errors surfaced by one run of the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("parsing flags [{}] for {command:?}: {source}", .args.join(" "))]
    FlagParse {
        command: String,
        args: Vec<String>,
        #[source]
        source: FlagError,
    },

    #[error("missing values for the required flags: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("parsing args: {0}")]
    Args(#[from] ArgError),

    #[error("action for flag {flag:?} failed: {source}")]
    Action {
        flag: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    UnknownSubcommand(#[from] UnknownSubcommandError),

    #[error("running command {command:?}: {source}")]
    Handler {
        command: String,
        #[source]
        source: BoxError,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("loading settings: {0}")]
    Settings(#[from] config::ConfigError),
}

impl Error {
    /// Usage errors: the command line itself was wrong.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::FlagParse { .. }
                | Error::MissingRequired(_)
                | Error::Args(_)
                | Error::UnknownSubcommand(_)
        )
    }
}

/// Result type for application layer operations.
pub type Result<T> = std::result::Result<T, Error>;
