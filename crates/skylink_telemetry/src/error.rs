//! Error types for the telemetry engine.

use thiserror::Error;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors that can occur while exchanging objects with the peer.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Transport-level send error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the send can be retried.
        retryable: bool,
    },

    /// The link has not reached connected status.
    #[error("link not connected")]
    NotConnected,

    /// A bounded event queue was full; the entry was dropped.
    #[error("event queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
}

impl LinkError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the failed operation can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Transport { retryable, .. } => *retryable,
            LinkError::NotConnected => true,
            LinkError::QueueFull { .. } => false,
        }
    }
}
