//! Error types for batch execution

use thiserror::Error;
use uuid::Uuid;

use crate::domain::status::ExecutionStatus;

/// Result type alias for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Errors raised while configuring or running jobs and steps
#[derive(Debug, Error)]
pub enum BatchError {
    /// Missing name/repository or an out-of-range setting.
    /// Raised before any execution record is created.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Attempted a status change the state machine forbids
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Error surfaced by a reader, processor or writer
    #[error(transparent)]
    ItemProcessing(anyhow::Error),

    /// Error raised inside a listener callback
    #[error("Listener notification failed: {0}")]
    ListenerNotification(String),

    /// Execution record not present in the repository
    #[error("Execution not found: {0}")]
    ExecutionNotFound(Uuid),

    /// Repository backend failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wrap an error coming from a pipeline stage
    pub fn item_processing(err: impl Into<anyhow::Error>) -> Self {
        Self::ItemProcessing(err.into())
    }

    /// Only pipeline stage errors may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ItemProcessing(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}
