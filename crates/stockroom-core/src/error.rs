//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - State rule violations                          │
//! │  └── ValidationError  - Form input failures (never reach the network)  │
//! │                                                                         │
//! │  stockroom-client errors (separate crate)                              │
//! │  └── ClientError      - Network / server / storage failures            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → shell notification  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// State rule violations.
///
/// These are raised before any request is built, so the remote API never
/// sees an operation the client already knows is illegal.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The role is reserved and its permission set is immutable.
    ///
    /// ## When This Occurs
    /// - Granting or revoking a permission on `superadmin`
    /// - Deleting or renaming `superadmin`
    #[error("Role '{role}' is reserved and cannot be modified")]
    ReservedRole { role: String },

    /// The session state machine does not allow this action in its current phase.
    ///
    /// ## User Workflow
    /// ```text
    /// Phase: Anonymous
    ///      │
    ///      ▼
    /// unlock("secret")
    ///      │
    ///      ▼
    /// InvalidTransition { phase: "anonymous", action: "unlock" }
    /// ```
    #[error("Cannot {action} while session is {phase}")]
    InvalidTransition { phase: String, action: String },

    /// A page holds more rows than its page size allows.
    #[error("Page holds {items} items but page size is {page_size}")]
    PageOverflow { items: usize, page_size: usize },

    /// Permission name is not part of the known catalog.
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Resolved locally inside the form that produced them. They are never
/// surfaced as a toast and never cause a network call.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_role_message() {
        let err = CoreError::ReservedRole {
            role: "superadmin".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Role 'superadmin' is reserved and cannot be modified"
        );
    }

    #[test]
    fn test_transition_message() {
        let err = CoreError::InvalidTransition {
            phase: "anonymous".to_string(),
            action: "unlock".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot unlock while session is anonymous");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "email".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
