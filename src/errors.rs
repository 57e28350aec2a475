//! Error types for the GRX client.

use std::io;
use thiserror::Error;

/// Errors that can occur during GRX client operation.
#[derive(Debug, Error)]
pub enum GrxClientError {
    /// Transport-level error (TCP, socket operations).
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Connection failed (TCP connection establishment failed).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Login handshake failed (prompt/banner mismatch or timeout).
    #[error("Login failed: {0}")]
    Login(String),

    /// A scene value that has no command representation (`Missing` or > 16).
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// A wire character outside the scene symbol table.
    #[error("Invalid scene symbol: {0:?}")]
    InvalidSymbol(char),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection has been closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GrxClientError {
    /// Returns true if this error is potentially retryable.
    ///
    /// Retryable errors are transient network or handshake failures that
    /// the reconnect loop keeps retrying. Non-retryable errors are fatal
    /// conditions like configuration mistakes or codec misuse.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionFailed(_) | Self::Login(_)
        )
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(
            GrxClientError::Transport(io::Error::from(io::ErrorKind::ConnectionReset))
                .is_retryable()
        );
        assert!(GrxClientError::ConnectionFailed("refused".to_string()).is_retryable());
        assert!(GrxClientError::Login("no prompt".to_string()).is_retryable());

        assert!(GrxClientError::Config("empty host".to_string()).is_fatal());
        assert!(GrxClientError::InvalidSymbol('z').is_fatal());
        assert!(GrxClientError::InvalidScene("Missing".to_string()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = GrxClientError::Login("prompt timeout".to_string());
        assert_eq!(err.to_string(), "Login failed: prompt timeout");

        let err = GrxClientError::InvalidSymbol('z');
        assert!(err.to_string().contains("'z'"));
    }
}
