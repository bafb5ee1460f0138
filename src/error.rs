//! Top-level error types for the assembler binary.
//!
//! The pipeline itself reports through [`crate::bundle::Error`] (malformed
//! invocations included, as `BadInvocation`); this module only adds the
//! catch-all wrappers `main` and library consumers need.

use thiserror::Error;

/// Result type alias for assembler operations
pub type Result<T> = std::result::Result<T, AssemblerError>;

/// Main error type for the assembler binary
#[derive(Error, Debug)]
pub enum AssemblerError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pipeline errors
    #[error("{0}")]
    Bundle(#[from] crate::bundle::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}
