//! Errors of the mapping module

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// Engine is already running
    #[error("Mapping engine already started: {0}")]
    AlreadyStarted(String),

    /// Engine task panicked or was aborted
    #[error("Task error: {0}")]
    ThreadError(String),
}
