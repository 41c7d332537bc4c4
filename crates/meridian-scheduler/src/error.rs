//! Error types for the scheduling core.

use thiserror::Error;

/// Scheduling core errors.
///
/// The core itself is a state machine whose invariant violations are fatal
/// assertions rather than errors; the fallible surface is configuration
/// loading.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
