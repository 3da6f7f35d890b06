//! API response types.

use serde::Serialize;

/// Payload of the status/introspection endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Server identity.
    pub server: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Number of live sessions.
    pub sessions: usize,
}

impl StatusResponse {
    pub fn new(sessions: usize) -> Self {
        Self {
            server: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            sessions,
        }
    }
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "REJECTED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The uniform rejection.
    ///
    /// Served identically for a bad method, a bad declared size, a
    /// malformed body, and an unknown session. A client holding a rejected
    /// session id must start over with a fresh session.
    pub fn rejected() -> Self {
        Self::new("REJECTED", "request rejected")
    }

    /// A concurrent request for the same session is already in flight.
    pub fn busy() -> Self {
        Self::new("SESSION_BUSY", "concurrent request for this session")
    }

    /// The worker did not reply within the exchange window.
    pub fn timeout() -> Self {
        Self::new("TIMEOUT", "worker did not reply in time")
    }

    /// No session can be started right now.
    pub fn unavailable() -> Self {
        Self::new("UNAVAILABLE", "cannot start a session right now")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}
