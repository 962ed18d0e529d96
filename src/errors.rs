// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

/// Message delivered to callers whose request arrives while another run is
/// still in flight.
pub const ADMISSION_REJECTED_MESSAGE: &str = "A Specification or Scenario is still running!";

#[derive(Error, Debug)]
pub enum ControllerError {
    /// Another execution holds the admission gate.
    #[error("{}", ADMISSION_REJECTED_MESSAGE)]
    AdmissionRejected,

    /// The execution target could not be determined (no open file, no cursor, ...).
    #[error("Unable to resolve execution target: {0}")]
    UnresolvedContext(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ControllerError {
    /// Whether this error means "the run could not even be attempted".
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ControllerError::AdmissionRejected | ControllerError::UnresolvedContext(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ControllerError>;
