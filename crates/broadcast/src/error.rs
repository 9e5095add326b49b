use thiserror::Error;

/// Failure reported by a broadcast channel when publishing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The channel refused the message.
    #[error("publish rejected: {reason}")]
    Rejected { reason: String },

    /// The channel could not be reached.
    #[error("broadcast channel unavailable: {reason}")]
    Unavailable { reason: String },
}

impl PublishError {
    /// Returns the reason carried by the error.
    pub fn reason(&self) -> &str {
        match self {
            PublishError::Rejected { reason } | PublishError::Unavailable { reason } => reason,
        }
    }
}

/// Result type for publish operations.
pub type Result<T> = std::result::Result<T, PublishError>;
