use std::time::Duration;

use thiserror::Error;

/// The message body could not be split into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unterminated quote starting at byte {offset}")]
pub struct ParseError {
    /// Byte offset of the opening quote in the tokenized string.
    pub offset: usize,
}

/// Errors raised while registering a command. Fatal to that registration
/// only; previously registered commands are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("duplicate command name or alias: {0}")]
    DuplicateName(String),

    #[error("unknown parent command: {0}")]
    UnknownParent(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// A token could not be converted into its declared type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("no {kind} matching \"{token}\" was found")]
    NotFound { kind: String, token: String },

    #[error("\"{token}\" matches {count} {kind}s; be more specific")]
    Ambiguous {
        kind: String,
        token: String,
        count: usize,
    },

    #[error("\"{token}\" is not a valid {expected}: {reason}")]
    BadFormat {
        expected: String,
        token: String,
        reason: String,
    },

    #[error("could not convert \"{token}\" into any candidate type ({})", list_failures(.attempts))]
    AllFailed {
        token: String,
        attempts: Vec<ConversionError>,
    },

    #[error("conversion of \"{token}\" timed out")]
    Timeout { token: String },
}

fn list_failures(attempts: &[ConversionError]) -> String {
    attempts
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A parameter could not be bound from the remaining tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("{parameter} is a required argument that is missing")]
    Missing { parameter: String },

    #[error("too many arguments passed ({surplus} left over)")]
    TooMany { surplus: usize },

    #[error("could not parse {parameter} (argument {position}): {source}")]
    Conversion {
        parameter: String,
        /// 1-based position of the offending token.
        position: usize,
        #[source]
        source: ConversionError,
    },
}

impl ArgumentError {
    /// Name of the offending parameter, where one exists.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::Missing { parameter } | Self::Conversion { parameter, .. } => Some(parameter),
            Self::TooMany { .. } => None,
        }
    }
}

/// The invocation arrived before the command's cooldown window reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("command is on cooldown; retry in {}s", .retry_after.as_secs())]
pub struct CooldownError {
    pub retry_after: Duration,
}

/// A command check predicate rejected the invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CheckError(pub String);

impl CheckError {
    pub fn failed() -> Self {
        Self("A check has failed.".to_string())
    }
}

/// Errors that can occur in the commands engine.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Cooldown(#[from] CooldownError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error("handler failed: {0}")]
    Handler(anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
