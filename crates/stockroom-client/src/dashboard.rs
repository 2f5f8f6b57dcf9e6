//! # Dashboard
//!
//! Wires the client pieces together around one API client and one store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Dashboard                                  │
//! │                                                                         │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐               │
//! │   │SessionManager│   │PermissionGate│   │  RoleAdmin   │               │
//! │   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘               │
//! │          │                  │                  │                        │
//! │          ▼                  ▼                  ▼                        │
//! │   ┌─────────────────────────────────────────────────────┐              │
//! │   │            ApiClient (Arc<dyn Transport>)           │              │
//! │   └─────────────────────────────────────────────────────┘              │
//! │                                                                         │
//! │   ListingController<T> ──► ResourceStore slice for T                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session End
//! Logout and an expired token end the same way: the permission cache is
//! invalidated and every store slice is cleared, so the next user starts
//! from nothing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stockroom_core::contract::RegisterRequest;
use stockroom_core::{PageState, PermissionSet, Session};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::gate::PermissionGate;
use crate::listing::ListingController;
use crate::roles::RoleAdmin;
use crate::session::SessionManager;
use crate::storage::{FileStorage, LocalStorage, MemoryStorage};
use crate::store::{ResourceStore, StoreSlot};
use crate::transport::{HttpTransport, Transport};

pub struct Dashboard {
    config: ClientConfig,
    api: Arc<ApiClient>,
    store: Arc<ResourceStore>,
    session: SessionManager,
    gate: Arc<PermissionGate>,
    roles: RoleAdmin,
}

impl Dashboard {
    /// Builds the dashboard over HTTP, persisting boot hints to the
    /// configured state file (in memory when there is none).
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
        let storage: Arc<dyn LocalStorage> = match config.storage_path() {
            Some(path) => {
                debug!(?path, "Using file storage");
                Arc::new(FileStorage::open(path)?)
            }
            None => {
                warn!("No data directory available, boot hints will not persist");
                Arc::new(MemoryStorage::new())
            }
        };
        Ok(Self::with_parts(config, transport, storage))
    }

    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        let api = Arc::new(ApiClient::new(transport));
        let store = Arc::new(ResourceStore::new());
        let gate = Arc::new(PermissionGate::new(api.clone(), store.clone()));
        let roles = RoleAdmin::new(api.clone(), store.clone(), gate.clone());
        let session = SessionManager::new(api.clone(), storage, config.idle_lock());
        Dashboard {
            config,
            api,
            store,
            session,
            gate,
            roles,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn roles(&self) -> &RoleAdmin {
        &self.roles
    }

    /// A listing for `T` starting at page 0 with the configured page size.
    pub fn listing<T: StoreSlot>(&self) -> ClientResult<ListingController<T>> {
        let state = PageState::first(self.config.listing.default_page_size)?;
        Ok(ListingController::new(self.api.clone(), self.store.clone(), state))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Signs in and resolves the role's permissions.
    ///
    /// A failed permission fetch does not fail the sign-in; the gate simply
    /// denies everything until [`Dashboard::refresh_permissions`] succeeds.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let session = self.session.login(email, password).await?;
        self.load_permissions(&session.user.role).await;
        Ok(session)
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<Session> {
        let session = self.session.register(request).await?;
        self.load_permissions(&session.user.role).await;
        Ok(session)
    }

    async fn load_permissions(&self, role: &str) {
        self.gate.invalidate();
        if let Err(e) = self.gate.resolve(role).await {
            warn!(role, error = %e, "Signed in without permissions");
        }
    }

    pub async fn unlock(&self, password: &str) -> ClientResult<()> {
        self.session.unlock(password).await
    }

    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.session.logout().await;
        self.forget_everything();
        result
    }

    /// Re-resolves the signed-in role, e.g. after an admin changed it.
    pub async fn refresh_permissions(&self) -> ClientResult<PermissionSet> {
        let role = self.session.role().ok_or(ClientError::NotAuthenticated)?;
        self.gate.invalidate();
        let outcome = self.gate.resolve(&role).await;
        self.settle(outcome)
    }

    /// Passes a result through, ending the session if the token expired.
    pub fn settle<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            if e.requires_reauthentication() && self.session.is_authenticated() {
                if let Err(clear) = self.session.expire() {
                    warn!(error = %clear, "Clearing persisted session failed");
                }
                self.forget_everything();
            }
        }
        result
    }

    fn forget_everything(&self) {
        self.gate.invalidate();
        self.store.clear();
        info!("Client state cleared");
    }
}
