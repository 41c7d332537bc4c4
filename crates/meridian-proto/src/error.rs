//! Error types for protocol-type validation.

use thiserror::Error;

/// Errors produced when parsing or validating protocol types.
#[derive(Error, Debug)]
pub enum ProtoError {
    /// Identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Resource index outside the known resource kinds.
    #[error("resource index out of range: {0}")]
    InvalidResourceIndex(usize),
}
