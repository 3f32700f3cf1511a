//! Error types for Quill Engine.

use thiserror::Error;

/// Result type alias for Quill operations.
pub type Result<T> = std::result::Result<T, QuillError>;

/// Main error type for Quill Engine.
#[derive(Debug, Error)]
pub enum QuillError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Connection failed to {endpoint}: {message}")]
    ConnectionFailed { endpoint: String, message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    // Session errors
    #[error("An edit session is already in flight")]
    SessionActive,

    #[error("Session cancelled")]
    Cancelled,

    #[error("Channel closed")]
    ChannelClosed,

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Validation errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl QuillError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error originated in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::ConnectionFailed { .. } | Self::BackendUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuillError::config("missing base URL");
        assert_eq!(err.to_string(), "Configuration error: missing base URL");
    }

    #[test]
    fn test_error_not_found() {
        assert!(QuillError::NotFound("doc-1".into()).is_not_found());
        assert!(!QuillError::SessionActive.is_not_found());
    }

    #[test]
    fn test_error_transport() {
        let err = QuillError::ConnectionFailed {
            endpoint: "http://localhost:8000".into(),
            message: "connection refused".into(),
        };
        assert!(err.is_transport());
        assert!(!QuillError::backend("boom").is_transport());
    }
}
