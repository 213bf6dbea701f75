//! Error types for the Pilum library.
//!
//! All failures are represented by the [`PilumError`] enum. Traversal
//! faults (an unreadable posting sequence, for instance) are fatal to the
//! in-flight query and propagate through every ancestor iterator node;
//! reaching the end of a sequence is never an error.
//!
//! # Examples
//!
//! ```
//! use pilum::error::{PilumError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(PilumError::query("Invalid query tree"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Pilum operations.
#[derive(Error, Debug)]
pub enum PilumError {
    /// I/O errors (posting storage reads, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index-related errors (snapshot lookups, deletion tracking)
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors (malformed iterator trees)
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid operation (misuse of the construction/traversal phases)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with PilumError.
pub type Result<T> = std::result::Result<T, PilumError>;

impl PilumError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PilumError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        PilumError::Query(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        PilumError::InvalidOperation(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PilumError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = PilumError::index("segment missing");
        assert_eq!(err.to_string(), "Index error: segment missing");

        let err = PilumError::query("single-child conjunction");
        assert_eq!(err.to_string(), "Query error: single-child conjunction");

        let err = PilumError::invalid_operation("add_child after start");
        assert_eq!(
            err.to_string(),
            "Invalid operation: add_child after start"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated postings");
        let err: PilumError = io_err.into();
        assert!(matches!(err, PilumError::Io(_)));
    }
}
