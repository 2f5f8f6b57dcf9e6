//! # Session Manager
//!
//! Signs users in and out, locks and unlocks the dashboard, and keeps the
//! persisted boot hints in step with the session.
//!
//! ## Logout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  logout()                                                              │
//! │     │                                                                   │
//! │     ▼ POST /auth/logout { refreshToken }     best effort, errors       │
//! │     │                                        are logged and ignored    │
//! │     ▼                                                                   │
//! │  local clear (always)                                                  │
//! │     ├── session machine → Anonymous                                    │
//! │     ├── access token dropped from the API client                       │
//! │     └── refreshToken + user removed from storage                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idle Lock
//! [`SessionManager::touch`] records activity. [`SessionManager::lock_if_idle`]
//! locks an authenticated session once the configured idle period passed.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use stockroom_core::contract::{AuthResponse, LoginRequest, RegisterRequest};
use stockroom_core::{RouteAccess, RouteDecision, Session, SessionMachine, SessionPhase, SessionUser};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::storage::{BootHints, LocalStorage, DARK_MODE_KEY, REFRESH_TOKEN_KEY, USER_KEY};

pub struct SessionManager {
    api: Arc<ApiClient>,
    storage: Arc<dyn LocalStorage>,
    machine: RwLock<SessionMachine>,
    phase: watch::Sender<SessionPhase>,
    idle_lock: Option<Duration>,
    last_activity: Mutex<Instant>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>, storage: Arc<dyn LocalStorage>, idle_lock: Option<Duration>) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Anonymous);
        SessionManager {
            api,
            storage,
            machine: RwLock::new(SessionMachine::new()),
            phase,
            idle_lock,
            last_activity: Mutex::new(Instant::now()),
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    fn machine(&self) -> RwLockWriteGuard<'_, SessionMachine> {
        self.machine.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot<R>(&self, f: impl FnOnce(&SessionMachine) -> R) -> R {
        f(&self.machine.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Applies a transition and publishes the new phase.
    fn transition<R>(&self, f: impl FnOnce(&mut SessionMachine) -> R) -> R {
        let (out, phase) = {
            let mut machine = self.machine();
            let out = f(&mut machine);
            (out, machine.phase())
        };
        self.phase.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
        out
    }

    pub fn phase(&self) -> SessionPhase {
        self.snapshot(SessionMachine::phase)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.snapshot(|m| m.session().cloned())
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.snapshot(|m| m.session().map(|s| s.user.clone()))
    }

    pub fn role(&self) -> Option<String> {
        self.snapshot(|m| m.session().map(|s| s.user.role.clone()))
    }

    pub fn last_error(&self) -> Option<String> {
        self.snapshot(|m| m.last_error().map(str::to_string))
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot(SessionMachine::is_authenticated)
    }

    pub fn guard(&self, access: RouteAccess) -> RouteDecision {
        self.snapshot(|m| m.guard(access))
    }

    // =========================================================================
    // Boot
    // =========================================================================

    /// Reads persisted hints. Does not authenticate anyone.
    pub fn restore(&self) -> ClientResult<BootHints> {
        let hints = BootHints::read(self.storage.as_ref())?;
        debug!(
            dark_mode = hints.dark_mode,
            has_refresh_token = hints.has_refresh_token,
            "Boot hints restored"
        );
        Ok(hints)
    }

    pub fn dark_mode(&self) -> ClientResult<bool> {
        Ok(self.storage.get(DARK_MODE_KEY)?.as_deref() == Some("true"))
    }

    /// Flips and persists the theme. Returns the new value.
    pub fn toggle_dark_mode(&self) -> ClientResult<bool> {
        let enabled = !self.dark_mode()?;
        self.storage
            .set(DARK_MODE_KEY, if enabled { "true" } else { "false" })?;
        Ok(enabled)
    }

    // =========================================================================
    // Sign In
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let request = LoginRequest::new(email, password);
        request.validate()?;
        self.transition(|m| m.begin_authentication())?;
        let outcome = self.api.login(&request).await;
        self.complete_authentication(outcome)
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<Session> {
        request.validate()?;
        self.transition(|m| m.begin_authentication())?;
        let outcome = self.api.register(request).await;
        self.complete_authentication(outcome)
    }

    fn complete_authentication(&self, outcome: ClientResult<AuthResponse>) -> ClientResult<Session> {
        match outcome {
            Ok(response) => {
                let session = response.into_session();
                self.transition(|m| m.authentication_succeeded(session.clone()))?;
                self.api.set_access_token(Some(session.access_token.clone()));
                self.persist(&session)?;
                self.touch();
                info!(email = %session.user.email, role = %session.user.role, "Signed in");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Sign in rejected");
                let message = e.user_message();
                self.transition(|m| m.authentication_failed(message))?;
                Err(e)
            }
        }
    }

    fn persist(&self, session: &Session) -> ClientResult<()> {
        self.storage.set(REFRESH_TOKEN_KEY, &session.refresh_token)?;
        let user = serde_json::to_string(&session.user)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.storage.set(USER_KEY, &user)
    }

    // =========================================================================
    // Lock
    // =========================================================================

    /// Locks the session. Tokens are kept.
    pub fn lock(&self) -> ClientResult<()> {
        self.transition(|m| m.lock())?;
        info!("Session locked");
        Ok(())
    }

    /// Email shown on the lock screen.
    pub fn lock_email(&self) -> Option<String> {
        self.snapshot(|m| m.lock_email().map(str::to_string))
    }

    /// Re-verifies the password for the locked session's email.
    pub async fn unlock(&self, password: &str) -> ClientResult<()> {
        let email = self.lock_email().ok_or_else(|| {
            ClientError::Core(stockroom_core::CoreError::InvalidTransition {
                phase: self.phase().to_string(),
                action: "unlock".to_string(),
            })
        })?;
        let request = LoginRequest::new(email, password);
        request.validate()?;

        match self.api.login(&request).await {
            Ok(response) => {
                let tokens = (response.access_token, response.refresh_token);
                let access = tokens.0.clone();
                let refresh = tokens.1.clone();
                self.transition(|m| m.unlock_succeeded(Some(tokens)))?;
                self.api.set_access_token(Some(access));
                self.storage.set(REFRESH_TOKEN_KEY, &refresh)?;
                self.touch();
                info!("Session unlocked");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Unlock rejected");
                let message = e.user_message();
                self.transition(|m| m.unlock_failed(message))?;
                Err(e)
            }
        }
    }

    /// Records user activity for the idle lock.
    pub fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Locks an authenticated session that has been idle too long.
    /// Returns true when it locked.
    pub fn lock_if_idle(&self) -> bool {
        let Some(limit) = self.idle_lock else {
            return false;
        };
        if self.phase() != SessionPhase::Authenticated {
            return false;
        }
        let idle = self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed();
        if idle < limit {
            return false;
        }
        match self.lock() {
            Ok(()) => {
                info!(idle_secs = idle.as_secs(), "Session locked after inactivity");
                true
            }
            Err(_) => false,
        }
    }

    // =========================================================================
    // Sign Out
    // =========================================================================

    /// Best-effort server invalidation, then an unconditional local clear.
    pub async fn logout(&self) -> ClientResult<()> {
        let refresh_token = self.snapshot(|m| m.session().map(|s| s.refresh_token.clone()));
        if let Some(token) = refresh_token {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "Server-side logout failed, clearing locally anyway");
            }
        }
        self.clear_local()?;
        info!("Signed out");
        Ok(())
    }

    /// Local clear only, for when the server already rejected our token.
    pub fn expire(&self) -> ClientResult<()> {
        warn!("Access token rejected, signing out locally");
        self.clear_local()
    }

    fn clear_local(&self) -> ClientResult<()> {
        self.transition(|m| m.logout());
        self.api.set_access_token(None);
        let token = self.storage.remove(REFRESH_TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        token.and(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::transport::mock::MockTransport;
    use crate::transport::HttpMethod;
    use serde_json::{json, Value};

    fn auth_body(access: &str, refresh: &str) -> Value {
        json!({
            "firstName": "Ada", "lastName": "Lovelace", "email": "ada@acme.test",
            "role": "manager", "businessID": "b-1", "businessName": "Acme",
            "businessAddress": [{ "city": "Springfield" }],
            "accessToken": access, "refreshToken": refresh
        })
    }

    fn setup(idle: Option<Duration>) -> (Arc<MockTransport>, Arc<MemoryStorage>, SessionManager) {
        let mock = Arc::new(MockTransport::new());
        let api = Arc::new(ApiClient::new(mock.clone()));
        let storage = Arc::new(MemoryStorage::new());
        let manager = SessionManager::new(api, storage.clone(), idle);
        (mock, storage, manager)
    }

    async fn signed_in(idle: Option<Duration>) -> (Arc<MockTransport>, Arc<MemoryStorage>, SessionManager) {
        let (mock, storage, manager) = setup(idle);
        mock.on_json(HttpMethod::Post, "/auth/login", 200, auth_body("access-1", "refresh-1"));
        manager.login("ada@acme.test", "correct horse").await.unwrap();
        (mock, storage, manager)
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user() {
        let (_mock, storage, manager) = signed_in(None).await;
        assert_eq!(manager.phase(), SessionPhase::Authenticated);
        assert_eq!(manager.role().as_deref(), Some("manager"));
        assert_eq!(
            storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(),
            Some("refresh-1")
        );
        let hints = manager.restore().unwrap();
        assert_eq!(hints.last_user.unwrap().first_name, "Ada");
        assert_eq!(
            manager.session().unwrap().business.address.unwrap().city.as_deref(),
            Some("Springfield")
        );
    }

    #[tokio::test]
    async fn test_rejected_login_stays_anonymous() {
        let (mock, storage, manager) = setup(None);
        mock.on_json(HttpMethod::Post, "/auth/login", 401, json!({ "error": "Invalid credentials" }));

        let err = manager.login("ada@acme.test", "wrong").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(manager.phase(), SessionPhase::Anonymous);
        assert_eq!(manager.last_error().as_deref(), Some("Invalid credentials"));
        assert!(manager.session().is_none());
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let (mock, _storage, manager) = setup(None);
        assert!(manager.login("not-an-email", "pw").await.unwrap_err().is_validation());
        assert_eq!(manager.phase(), SessionPhase::Anonymous);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_lock_then_unlock_restores_identity() {
        let (mock, _storage, manager) = signed_in(None).await;
        let before = manager.current_user();

        manager.lock().unwrap();
        assert_eq!(manager.phase(), SessionPhase::Locked);
        assert_eq!(manager.guard(RouteAccess::Protected), RouteDecision::RedirectToLock);
        assert_eq!(manager.lock_email().as_deref(), Some("ada@acme.test"));

        mock.on_json(HttpMethod::Post, "/auth/login", 200, auth_body("access-2", "refresh-2"));
        manager.unlock("correct horse").await.unwrap();

        assert_eq!(manager.phase(), SessionPhase::Authenticated);
        assert_eq!(manager.current_user(), before);
        assert_eq!(manager.session().unwrap().access_token, "access-2");
        let sent = mock.requests().pop().unwrap();
        assert_eq!(sent.body.unwrap()["email"], "ada@acme.test");
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_lock_and_tokens() {
        let (mock, storage, manager) = signed_in(None).await;
        manager.lock().unwrap();

        mock.on_json(HttpMethod::Post, "/auth/login", 401, json!({ "message": "Wrong password" }));
        assert!(manager.unlock("nope").await.is_err());

        assert_eq!(manager.phase(), SessionPhase::Locked);
        assert_eq!(manager.last_error().as_deref(), Some("Wrong password"));
        assert_eq!(manager.session().unwrap().refresh_token, "refresh-1");
        assert_eq!(
            storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(),
            Some("refresh-1")
        );
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        for locked in [false, true] {
            let (mock, storage, manager) = signed_in(None).await;
            if locked {
                manager.lock().unwrap();
            }
            mock.on_unreachable(HttpMethod::Post, "/auth/logout");

            manager.logout().await.unwrap();

            assert_eq!(manager.phase(), SessionPhase::Anonymous);
            assert!(manager.session().is_none());
            assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
            assert_eq!(storage.get(USER_KEY).unwrap(), None);
            assert_eq!(mock.count(HttpMethod::Post, "/auth/logout"), 1);
            let sent = mock.requests().pop().unwrap();
            assert_eq!(sent.body.unwrap()["refreshToken"], "refresh-1");
        }
    }

    #[tokio::test]
    async fn test_unlock_when_not_locked_is_rejected() {
        let (mock, _storage, manager) = setup(None);
        assert!(matches!(
            manager.unlock("whatever").await,
            Err(ClientError::Core(_))
        ));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_lock() {
        let (_mock, _storage, manager) = signed_in(Some(Duration::from_secs(60))).await;
        assert!(!manager.lock_if_idle());

        tokio::time::advance(Duration::from_secs(30)).await;
        manager.touch();
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(!manager.lock_if_idle());

        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(manager.lock_if_idle());
        assert_eq!(manager.phase(), SessionPhase::Locked);
    }

    #[tokio::test]
    async fn test_phase_changes_are_published() {
        let (mock, _storage, manager) = setup(None);
        let mut rx = manager.subscribe();
        mock.on_json(HttpMethod::Post, "/auth/login", 200, auth_body("a", "r"));
        manager.login("ada@acme.test", "correct horse").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionPhase::Authenticated);
    }

    #[test]
    fn test_theme_toggle_persists() {
        let (_mock, storage, manager) = setup(None);
        assert!(!manager.dark_mode().unwrap());
        assert!(manager.toggle_dark_mode().unwrap());
        assert_eq!(storage.get(DARK_MODE_KEY).unwrap().as_deref(), Some("true"));
        assert!(!manager.toggle_dark_mode().unwrap());
    }
}
