//! # Request State
//!
//! The observable state of one request lifecycle.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle {None, false, None}                                              │
//! │     │ begin()                                                           │
//! │     ▼                                                                   │
//! │  Loading {prev data, true, None}                                       │
//! │     │                                                                   │
//! │     ├── succeed(payload) ──► Success {Some(payload), false, None}      │
//! │     │                                                                   │
//! │     └── fail(message) ─────► Error   {None, false, Some(message)}      │
//! │                                                                         │
//! │  reset() from any state ───► Idle                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once a request has finished, exactly one of `data` and `error` is set.

use serde::{Deserialize, Serialize};

/// Coarse status derived from [`RequestState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> RequestState<T> {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Marks the request as sent. Previous data stays visible while loading.
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn succeed(&mut self, data: T) {
        self.loading = false;
        self.data = Some(data);
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.data = None;
        self.error = Some(message.into());
    }

    /// Back to idle. Does not cancel anything in flight.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn status(&self) -> RequestStatus {
        if self.loading {
            RequestStatus::Loading
        } else if self.error.is_some() {
            RequestStatus::Error
        } else if self.data.is_some() {
            RequestStatus::Success
        } else {
            RequestStatus::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_then_reset() {
        let mut state = RequestState::idle();
        state.begin();
        assert_eq!(state.status(), RequestStatus::Loading);
        state.succeed("Supplier deleted successfully");
        assert_eq!(state.status(), RequestStatus::Success);
        state.reset();
        assert_eq!(state, RequestState::default());
        assert_eq!(state.status(), RequestStatus::Idle);
    }

    #[test]
    fn test_failure_clears_data() {
        let mut state = RequestState::idle();
        state.begin();
        state.succeed(1);
        state.begin();
        assert_eq!(state.data, Some(1));
        assert!(state.error.is_none());
        state.fail("Network error");
        assert_eq!(state.data, None);
        assert_eq!(state.error.as_deref(), Some("Network error"));
        assert!(!state.loading);
    }

    #[test]
    fn test_begin_clears_previous_error() {
        let mut state: RequestState<u8> = RequestState::idle();
        state.fail("boom");
        state.begin();
        assert!(state.error.is_none());
        assert!(state.loading);
    }
}
