//! # Client Error Types
//!
//! Everything that can go wrong between a dashboard action and the REST API.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Transport    │  │     Server      │  │      Local rules        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network        │  │  Server{status} │  │  Validation             │ │
//! │  │  InvalidUrl     │  │  AuthExpired    │  │  Core (reserved role,   │ │
//! │  │                 │  │  Malformed...   │  │   illegal transition)   │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │     Storage     │  │  Configuration  │                              │
//! │  │  Storage        │  │  Config         │                              │
//! │  │                 │  │  NotAuthent...  │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Where Errors Surface
//! - `Validation` stays inside the form that produced it. Never a toast.
//! - `Network`, `Server`, `MalformedResponse` become a notification through
//!   [`ClientError::user_message`]. The view keeps its pre-request state.
//! - `AuthExpired` makes the dashboard drop the local session.

use stockroom_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Fallback notification text when the server sent no message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// No response was received (DNS, refused connection, timeout, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// The configured base URL or a built path is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Server Errors
    // =========================================================================
    /// The server answered with a non-2xx status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 401. The access token is no longer accepted.
    #[error("Session expired. Please sign in again.")]
    AuthExpired,

    /// A 2xx response whose body did not match the contract.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // =========================================================================
    // Local Rule Errors
    // =========================================================================
    /// Form input rejected before any request was built.
    #[error(transparent)]
    Validation(ValidationError),

    /// A state rule (reserved role, illegal session transition).
    #[error(transparent)]
    Core(CoreError),

    /// The action needs a signed-in, unlocked session.
    #[error("Not signed in")]
    NotAuthenticated,

    // =========================================================================
    // Local Environment Errors
    // =========================================================================
    /// Persisted key/value storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded, saved or validated.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::Validation(err)
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ClientError::Validation(v),
            other => ClientError::Core(other),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else if err.is_builder() {
            ClientError::InvalidUrl(err.to_string())
        } else if err.is_timeout() {
            ClientError::Network("request timed out".to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedResponse(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// Returns true if repeating the same request may succeed.
    ///
    /// ## Retryable Errors
    /// - Network failures
    /// - 5xx server errors and 429
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if the user has to sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, ClientError::AuthExpired | ClientError::NotAuthenticated)
    }

    /// Returns true if the error belongs to a form field, not a notification.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::AuthExpired => Some(401),
            _ => None,
        }
    }

    /// Text for the notification area.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server { message, .. } if !message.trim().is_empty() => message.clone(),
            ClientError::Server { .. } => GENERIC_FAILURE.to_string(),
            ClientError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ClientError::MalformedResponse(_) => {
                "The server sent an unexpected response.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ClientError::Network("refused".into()).is_retryable());
        assert!(ClientError::Server {
            status: 503,
            message: String::new()
        }
        .is_retryable());

        assert!(!ClientError::Server {
            status: 404,
            message: "Supplier not found".into()
        }
        .is_retryable());
        assert!(!ClientError::AuthExpired.is_retryable());
        assert!(!ClientError::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ClientError::Server {
            status: 409,
            message: "Supplier has open orders".into(),
        };
        assert_eq!(err.user_message(), "Supplier has open orders");

        let err = ClientError::Server {
            status: 500,
            message: "  ".into(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_core_validation_is_flattened() {
        let core = CoreError::Validation(ValidationError::Required {
            field: "email".into(),
        });
        let err: ClientError = core.into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "email is required");

        let err: ClientError = CoreError::ReservedRole {
            role: "superadmin".into(),
        }
        .into();
        assert!(matches!(err, ClientError::Core(_)));
    }

    #[test]
    fn test_reauthentication() {
        assert!(ClientError::AuthExpired.requires_reauthentication());
        assert_eq!(ClientError::AuthExpired.status(), Some(401));
        assert!(!ClientError::Network("x".into()).requires_reauthentication());
    }
}
