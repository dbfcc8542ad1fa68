//! Error types for telemetry-trending
//!
//! Only ingestion defects are hard errors. Missing mnemonics, empty
//! windows and duplicate writes are trending outcomes: they are logged and
//! reported, never raised.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Telemetry-trending error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required mnemonic is absent from the run's input mapping
    #[error("Mnemonic {0} not present in the ingested batch")]
    MissingMnemonic(String),

    /// A sample value has the wrong type for the predicate or reduction
    /// applied to it (upstream ingestion defect)
    #[error("Malformed value for {mnemonic} at t={timestamp}: expected {expected}, got {found:?}")]
    MalformedValue {
        /// Mnemonic the sample belongs to
        mnemonic: String,
        /// Sample timestamp
        timestamp: f64,
        /// Expected value kind ("number" or "label")
        expected: &'static str,
        /// Raw value as ingested
        found: String,
    },

    /// Samples were handed over out of time order
    #[error("Series {mnemonic} is not time ordered: {previous} followed by {next}")]
    UnorderedSeries {
        /// Mnemonic of the offending series
        mnemonic: String,
        /// Earlier sample timestamp
        previous: f64,
        /// Later sample timestamp that precedes it
        next: f64,
    },

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Run configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error (Parquet/Arrow ingestion or statistics store)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
