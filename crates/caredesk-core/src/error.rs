// Error types for the notification core

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for notification operations
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur in the notification subsystem
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Store read/write error
    #[error("Store error: {0}")]
    Store(String),

    /// Feed subscription error
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Recipient identifier rejected
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Notification not found
    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl NotifyError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        NotifyError::Store(msg.into())
    }

    /// Create a subscription error
    pub fn subscription(msg: impl Into<String>) -> Self {
        NotifyError::Subscription(msg.into())
    }

    /// Create an invalid recipient error
    pub fn invalid_recipient(msg: impl Into<String>) -> Self {
        NotifyError::InvalidRecipient(msg.into())
    }
}
