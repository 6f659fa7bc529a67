//! Error types for the pdfcrypt security handler.

use std::io;
use thiserror::Error;

/// Primary error type for encryption and decryption operations.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The password was rejected before hashing (SASLprep failure).
    #[error("invalid password: {0}")]
    InvalidPassword(String),

    #[error("invalid encryption dictionary: {0}")]
    InvalidEncryptionDict(String),

    /// Non-`Standard` filter, unknown V/R combination, or an algorithm the
    /// crypto provider has disabled.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("unexpected end of input: {0}")]
    UnexpectedEof(&'static str),

    /// Cipher engine set-up or operation failure.
    #[error("internal logic error: {0}")]
    InternalLogic(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("key not found: {0}")]
    KeyError(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<PdfError> for io::Error {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Io(inner) => inner,
            PdfError::UnexpectedEof(_) => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
