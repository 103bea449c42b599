/**
 * Realtime Gateway Error Types
 *
 * This module defines the error enum used across the gateway. Each
 * variant carries enough context to log and to map onto an HTTP
 * response where one is involved.
 *
 * # Propagation Policy
 *
 * Authorization functions never let these errors escape to the socket
 * event dispatcher; they convert every failure mode into a typed
 * decision at the boundary. The sweeper logs but does not propagate
 * per-connection failures. Only startup code treats errors as fatal.
 */

use axum::http::StatusCode;
use thiserror::Error;

/// Gateway-specific error types
///
/// # Usage
///
/// ```rust
/// use pagespace_realtime::error::RealtimeError;
///
/// let err = RealtimeError::config("REALTIME_BROADCAST_SECRET is not set");
/// assert!(err.to_string().contains("REALTIME_BROADCAST_SECRET"));
/// ```
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Configuration error (missing/weak secret, bad setting)
    ///
    /// Fatal at startup. The gateway must not come up with an unusable
    /// signing secret.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable error message
        message: String,
    },

    /// Handler error (invalid request at the HTTP surface)
    #[error("Handler error: {message}")]
    Handler {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Transient session-service failure
    ///
    /// Distinct from a definitive "session invalid" result, which is
    /// modeled as `Ok(None)` by the session service. This variant means
    /// the check itself could not be performed.
    #[error("Session service error: {message}")]
    Session {
        /// Human-readable error message
        message: String,
    },

    /// Transient permission-service failure
    ///
    /// The permission lookup could not be performed. Callers in the
    /// authorization path convert this into a fail-closed denial.
    #[error("Permission service error: {message}")]
    Upstream {
        /// Human-readable error message
        message: String,
    },
}

impl RealtimeError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Handler {
            status,
            message: message.into(),
        }
    }

    /// Create a transient session-service error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a transient permission-service error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Config` - 500 Internal Server Error (should never reach a
    ///   request handler; configuration is validated at startup)
    /// - `Handler` - the status carried by the error
    /// - `Session` / `Upstream` - 502 Bad Gateway
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Handler { status, .. } => *status,
            Self::Session { .. } | Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::Config { message }
            | Self::Handler { message, .. }
            | Self::Session { message }
            | Self::Upstream { message } => message.clone(),
        }
    }
}
