//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// Errors produced while reading input records or validating configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("parse error on line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `td-core`.
pub type CoreResult<T> = Result<T, CoreError>;
