//! Application error types.

use common::InvalidContextName;
use dispatch::RegistryError;
use thiserror::Error;

/// Errors raised while wiring the application together.
#[derive(Debug, Error)]
pub enum AppError {
    /// A bounded context name was rejected.
    #[error("Invalid context name: {0}")]
    InvalidContext(#[from] InvalidContextName),

    /// A handler registry could not be started or registered.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The metrics recorder could not be installed.
    #[error("Metrics error: {0}")]
    Metrics(String),
}
