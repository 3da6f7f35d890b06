//! Error types for session-relay.

use thiserror::Error;

/// Main error type for relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Session with the given ID was not found.
    ///
    /// Also covers session references that fail to parse: the client is
    /// told nothing beyond "start a new session".
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A second exchange was attempted while one is already in flight.
    ///
    /// The in-flight exchange is left alone; only the conflicting caller
    /// fails.
    #[error("session busy: concurrent exchange in progress")]
    SessionBusy,

    /// The worker did not reply within the configured window.
    #[error("no worker reply within the timeout window")]
    ReplyTimeout,

    /// The worker exited while its session was still registered.
    #[error("worker is gone")]
    WorkerGone,

    /// A worker could not be constructed.
    #[error("worker failed to start: {0}")]
    WorkerSpawn(String),

    /// The configured session limit has been reached.
    #[error("session limit reached")]
    AtCapacity,

    /// Message is not a JSON object or violates broker framing rules.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_display() {
        let err = RelayError::SessionNotFound("sess-00000001".into());
        assert!(err.to_string().contains("sess-00000001"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_busy_display() {
        let err = RelayError::SessionBusy;
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn test_timeout_display() {
        let err = RelayError::ReplyTimeout;
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let relay_err: RelayError = io_err.into();
        assert!(matches!(relay_err, RelayError::Io(_)));
        assert!(relay_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_worker_spawn_display() {
        let err = RelayError::WorkerSpawn("no device".into());
        assert!(err.to_string().contains("failed to start"));
        assert!(err.to_string().contains("no device"));
    }
}
