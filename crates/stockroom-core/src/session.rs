//! # Session State Machine
//!
//! Who is signed in, and which transitions are legal.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Phases                                     │
//! │                                                                         │
//! │  ┌───────────┐  login/register  ┌────────────────┐                     │
//! │  │ Anonymous │ ───────────────► │ Authenticating │                     │
//! │  └───────────┘ ◄─────────────── └───────┬────────┘                     │
//! │     ▲    ▲         rejected             │ confirmed                     │
//! │     │    │                              ▼                               │
//! │     │    │     logout          ┌───────────────┐                       │
//! │     │    └──────────────────── │ Authenticated │ ◄──┐                  │
//! │     │                          └───────┬───────┘    │ password ok      │
//! │     │                      lock / idle │            │                  │
//! │     │        logout                    ▼            │                  │
//! │     └───────────────────────── ┌───────────────┐ ───┘                  │
//! │                                │    Locked     │ ◄──┐ wrong password   │
//! │                                └───────────────┘ ───┘                  │
//! │                                                                         │
//! │  Tokens survive Locked. Only logout discards them.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Identity
// =============================================================================

/// The signed-in user as the session knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
}

impl SessionUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A postal address as the auth endpoints send it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub country: Option<String>,
}

/// The business the signed-in user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

/// Everything the dashboard holds for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: SessionUser,
    pub business: Business,
    pub access_token: String,
    pub refresh_token: String,
    pub is_locked: bool,
}

// =============================================================================
// Phases
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    Locked,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Anonymous => "anonymous",
            SessionPhase::Authenticating => "authenticating",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Locked => "locked",
        };
        f.write_str(s)
    }
}

/// What a route requires from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Anyone (e.g. a status page).
    Public,
    /// Only visitors without a session (login, register).
    GuestOnly,
    /// Signed-in and unlocked.
    Protected,
}

/// Outcome of a route guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectToLock,
    RedirectToHome,
}

// =============================================================================
// Machine
// =============================================================================

/// Pure session state: phase, session entity and the last surfaced error.
#[derive(Debug, Clone, Default)]
pub struct SessionMachine {
    phase: SessionPhase,
    session: Option<Session>,
    last_error: Option<String>,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// A locked session renders as signed-out even though it keeps tokens.
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    /// Anonymous → Authenticating.
    pub fn begin_authentication(&mut self) -> CoreResult<()> {
        self.expect(&[SessionPhase::Anonymous], "sign in")?;
        self.phase = SessionPhase::Authenticating;
        self.last_error = None;
        Ok(())
    }

    /// Authenticating → Authenticated.
    pub fn authentication_succeeded(&mut self, session: Session) -> CoreResult<()> {
        self.expect(&[SessionPhase::Authenticating], "complete sign in")?;
        self.session = Some(Session {
            is_locked: false,
            ..session
        });
        self.phase = SessionPhase::Authenticated;
        self.last_error = None;
        Ok(())
    }

    /// Authenticating → Anonymous, with the rejection surfaced.
    pub fn authentication_failed(&mut self, message: impl Into<String>) -> CoreResult<()> {
        self.expect(&[SessionPhase::Authenticating], "fail sign in")?;
        self.session = None;
        self.phase = SessionPhase::Anonymous;
        self.last_error = Some(message.into());
        Ok(())
    }

    /// Authenticated → Locked. Locking an already locked session is a no-op.
    pub fn lock(&mut self) -> CoreResult<()> {
        if self.phase == SessionPhase::Locked {
            return Ok(());
        }
        self.expect(&[SessionPhase::Authenticated], "lock")?;
        if let Some(session) = self.session.as_mut() {
            session.is_locked = true;
        }
        self.phase = SessionPhase::Locked;
        Ok(())
    }

    /// Email to pre-fill on the lock screen.
    pub fn lock_email(&self) -> Option<&str> {
        match self.phase {
            SessionPhase::Locked => self.session.as_ref().map(|s| s.user.email.as_str()),
            _ => None,
        }
    }

    /// Locked → Authenticated.
    ///
    /// Identity is kept as it was before the lock. If the re-verification
    /// returned fresh tokens they replace the held ones.
    pub fn unlock_succeeded(&mut self, fresh_tokens: Option<(String, String)>) -> CoreResult<()> {
        self.expect(&[SessionPhase::Locked], "unlock")?;
        if let Some(session) = self.session.as_mut() {
            session.is_locked = false;
            if let Some((access, refresh)) = fresh_tokens {
                session.access_token = access;
                session.refresh_token = refresh;
            }
        }
        self.phase = SessionPhase::Authenticated;
        self.last_error = None;
        Ok(())
    }

    /// Locked → Locked with the rejection surfaced. Tokens are untouched.
    pub fn unlock_failed(&mut self, message: impl Into<String>) -> CoreResult<()> {
        self.expect(&[SessionPhase::Locked], "fail unlock")?;
        self.last_error = Some(message.into());
        Ok(())
    }

    /// Any phase → Anonymous. Returns the discarded session, if any.
    pub fn logout(&mut self) -> Option<Session> {
        self.phase = SessionPhase::Anonymous;
        self.last_error = None;
        self.session.take()
    }

    /// Decides whether a route may render for the current phase.
    pub fn guard(&self, access: RouteAccess) -> RouteDecision {
        match (access, self.phase) {
            (RouteAccess::Public, _) => RouteDecision::Allow,
            (RouteAccess::GuestOnly, SessionPhase::Authenticated) => RouteDecision::RedirectToHome,
            (RouteAccess::GuestOnly, SessionPhase::Locked) => RouteDecision::RedirectToLock,
            (RouteAccess::GuestOnly, _) => RouteDecision::Allow,
            (RouteAccess::Protected, SessionPhase::Authenticated) => RouteDecision::Allow,
            (RouteAccess::Protected, SessionPhase::Locked) => RouteDecision::RedirectToLock,
            (RouteAccess::Protected, _) => RouteDecision::RedirectToLogin,
        }
    }

    fn expect(&self, allowed: &[SessionPhase], action: &str) -> CoreResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                phase: self.phase.to_string(),
                action: action.to_string(),
            })
        }
    }
}
