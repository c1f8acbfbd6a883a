//! Error types shared by the command parser, synchronizer and mailbox
//! processor.
use thiserror::Error;

/// A command-bearing message that could not be turned into a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("timestamp {0:?} does not match the layout YYYYMMDD HH:MM")]
    Layout(String),

    #[error("timestamp {0:?} is not a valid calendar date and time")]
    Calendar(String),

    #[error("timestamp {input:?} does not exist in time zone {zone}")]
    NonexistentLocalTime { input: String, zone: String },

    #[error("expected a start and an end timestamp line in the body, found {0} line(s)")]
    MissingTimestampLines(usize),
}

/// A failure reported by the mail and calendar provider.
#[derive(Error, Debug)]
#[error("{operation} failed for {target}: {source:#}")]
pub struct ProviderError {
    pub operation: &'static str,
    pub target: String,
    #[source]
    pub source: anyhow::Error,
}

impl ProviderError {
    pub fn new(operation: &'static str, target: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            operation,
            target: target.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Missing or invalid settings. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing env var {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for env var {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("No mailboxes configured in {0}")]
    EmptyMailboxList(&'static str),
}
