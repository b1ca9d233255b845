//! Error types for the Falx library.
//!
//! All fallible operations in the crate return [`Result`], whose error type is
//! the [`FalxError`] enum. Note that query *evaluation* does not use this type:
//! per the search contract, evaluation errors are carried as a sticky string on
//! the search result instead of unwinding through `Result`.
//!
//! # Examples
//!
//! ```
//! use falx::error::{FalxError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(FalxError::parse("unbalanced parenthesis"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Falx operations.
#[derive(Error, Debug)]
pub enum FalxError {
    /// I/O errors (reading documents from external sources, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Schema-related errors (duplicate fields, invalid definitions)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Query parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Field-related errors (unknown field, wrong field type)
    #[error("Field error: {0}")]
    Field(String),

    /// Document conversion errors
    #[error("Document error: {0}")]
    Document(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with FalxError.
pub type Result<T> = std::result::Result<T, FalxError>;

impl FalxError {
    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        FalxError::Schema(msg.into())
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        FalxError::Parse(msg.into())
    }

    /// Create a new field error.
    pub fn field<S: Into<String>>(msg: S) -> Self {
        FalxError::Field(msg.into())
    }

    /// Create a new document error.
    pub fn document<S: Into<String>>(msg: S) -> Self {
        FalxError::Document(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        FalxError::InvalidOperation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = FalxError::schema("duplicate field 'title'");
        assert_eq!(error.to_string(), "Schema error: duplicate field 'title'");

        let error = FalxError::parse("unexpected token");
        assert_eq!(error.to_string(), "Parse error: unexpected token");

        let error = FalxError::field("unknown field 'body'");
        assert_eq!(error.to_string(), "Field error: unknown field 'body'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let falx_error = FalxError::from(io_error);

        match falx_error {
            FalxError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
