//! Error types for the analytics pipeline.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte source could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The mapping table is not valid CSV.
    #[error("error reading mapping table: {0}")]
    Mapping(#[from] csv::Error),

    /// The event source does not start with a JSON array.
    #[error("expected JSON array, got {0}")]
    Framing(String),

    /// A single record in the event array could not be decoded.
    #[error("error decoding record {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A click event carried an unparseable timestamp.
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// Timestamp that does not match `YYYY-MM-DDTHH:MM:SSZ`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error parsing timestamp {value:?}: expected YYYY-MM-DDTHH:MM:SSZ")]
pub struct TimestampError {
    pub value: String,
}

impl TimestampError {
    pub(crate) fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}
