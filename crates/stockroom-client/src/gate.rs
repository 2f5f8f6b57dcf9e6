//! # Permission Gate
//!
//! Decides whether a piece of UI is shown for the signed-in role.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  resolve("manager")                                                    │
//! │     │                                                                   │
//! │     ├── cached for "manager"? ──► reuse                                │
//! │     │                                                                   │
//! │     ▼ GET /roles/manager/permissions                                   │
//! │     │                                                                   │
//! │     ├── ok    ──► PermissionSet (unknown names logged, dropped)        │
//! │     └── error ──► empty set cached: every check denies                 │
//! │                                                                         │
//! │  has_any([a, b])   true iff the set holds a or b. [] → false           │
//! │  render(req, content, fallback) → content | fallback | nothing         │
//! │                                                                         │
//! │  Display-only. The API enforces the same rules server-side.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use stockroom_core::permission::gate;
use stockroom_core::{PermissionName, PermissionSet};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::store::ResourceStore;

#[derive(Debug, Clone)]
struct CachedRole {
    role: String,
    set: PermissionSet,
}

pub struct PermissionGate {
    api: Arc<ApiClient>,
    store: Arc<ResourceStore>,
    cache: RwLock<Option<CachedRole>>,
    /// Bumped by every invalidation. A fetch that started under an older
    /// generation must not install its result.
    generation: AtomicU64,
}

impl PermissionGate {
    pub fn new(api: Arc<ApiClient>, store: Arc<ResourceStore>) -> Self {
        PermissionGate {
            api,
            store,
            cache: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Loads the role's permission set, reusing the cache for the same role.
    ///
    /// On failure the role is cached with an empty set and the error is
    /// returned, so the caller can react (e.g. to an expired session) while
    /// every check keeps denying.
    ///
    /// If the cache is invalidated while the fetch is in flight, the result
    /// is returned to the caller but not cached.
    pub async fn resolve(&self, role: &str) -> ClientResult<PermissionSet> {
        if let Some(cached) = self.cached_for(role) {
            return Ok(cached);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        match self.api.role_permissions(role).await {
            Ok(bindings) => {
                let (set, unknown) = PermissionSet::from_role_permissions(&bindings);
                if !unknown.is_empty() {
                    warn!(role, ?unknown, "Ignoring permissions missing from the catalog");
                }
                if self.install(generation, role, set.clone()) {
                    info!(role, granted = set.len(), "Permissions resolved");
                    self.store.set_role_permissions(role, bindings);
                }
                Ok(set)
            }
            Err(e) => {
                warn!(role, error = %e, "Permission fetch failed, denying everything");
                self.install(generation, role, PermissionSet::new());
                Err(e)
            }
        }
    }

    fn cached_for(&self, role: &str) -> Option<PermissionSet> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|c| c.role == role)
            .map(|c| c.set.clone())
    }

    /// Caches `set` unless an invalidation happened since `generation` was
    /// read. Returns whether it was cached.
    fn install(&self, generation: u64, role: &str, set: PermissionSet) -> bool {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(role, "Discarding permissions resolved before an invalidation");
            return false;
        }
        *cache = Some(CachedRole {
            role: role.to_string(),
            set,
        });
        true
    }

    /// Forgets the cached set (role change, permission edit, session end).
    ///
    /// Fetches still in flight will not repopulate the cache.
    pub fn invalidate(&self) {
        let previous = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            self.generation.fetch_add(1, Ordering::SeqCst);
            cache.take()
        };
        if let Some(previous) = previous {
            debug!(role = %previous.role, "Permission cache invalidated");
        }
    }

    /// Role whose set is currently cached.
    pub fn cached_role(&self) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.role.clone())
    }

    /// The cached set. Empty when nothing is resolved.
    pub fn permissions(&self) -> PermissionSet {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.set.clone())
            .unwrap_or_default()
    }

    pub fn has_any(&self, required: &[PermissionName]) -> bool {
        self.permissions().has_any(required)
    }

    pub fn has_all(&self, required: &[PermissionName]) -> bool {
        self.permissions().has_all(required)
    }

    /// `content` if allowed, else `fallback`, else nothing.
    pub fn render<T>(&self, required: &[PermissionName], content: T, fallback: Option<T>) -> Option<T> {
        gate(&self.permissions(), required, content, fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::HttpMethod;
    use serde_json::json;
    use std::time::Duration;

    fn setup() -> (Arc<MockTransport>, PermissionGate) {
        let mock = Arc::new(MockTransport::new());
        let api = Arc::new(ApiClient::new(mock.clone()));
        let gate = PermissionGate::new(api, Arc::new(ResourceStore::new()));
        (mock, gate)
    }

    fn binding(name: &str) -> serde_json::Value {
        json!({ "permissionId": format!("p-{}", name), "permissionName": name })
    }

    #[tokio::test]
    async fn test_has_any_is_or_and_empty_denies() {
        let (mock, gate) = setup();
        mock.on_json(
            HttpMethod::Get,
            "/roles/manager/permissions",
            200,
            json!([binding("view_suppliers"), binding("delete_supplier")]),
        );

        gate.resolve("manager").await.unwrap();
        assert!(gate.has_any(&[PermissionName::CreateUser, PermissionName::DeleteSupplier]));
        assert!(!gate.has_any(&[PermissionName::CreateUser]));
        assert!(!gate.has_any(&[]));
        assert!(gate.has_all(&[PermissionName::ViewSuppliers, PermissionName::DeleteSupplier]));
        assert!(!gate.has_all(&[PermissionName::ViewSuppliers, PermissionName::CreateUser]));
    }

    #[tokio::test]
    async fn test_cached_per_role() {
        let (mock, gate) = setup();
        mock.on_json(HttpMethod::Get, "/roles/manager/permissions", 200, json!([binding("view_products")]));
        mock.on_json(HttpMethod::Get, "/roles/clerk/permissions", 200, json!([]));

        gate.resolve("manager").await.unwrap();
        gate.resolve("manager").await.unwrap();
        assert_eq!(mock.count(HttpMethod::Get, "/roles/manager/permissions"), 1);

        gate.resolve("clerk").await.unwrap();
        assert_eq!(gate.cached_role().as_deref(), Some("clerk"));
        assert!(!gate.has_any(&[PermissionName::ViewProducts]));

        gate.invalidate();
        gate.resolve("manager").await.unwrap();
        assert_eq!(mock.count(HttpMethod::Get, "/roles/manager/permissions"), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_closed() {
        let (mock, gate) = setup();
        mock.on(HttpMethod::Get, "/roles/manager/permissions", 500, "");

        assert!(gate.resolve("manager").await.is_err());
        assert!(!gate.has_any(&[PermissionName::ViewSuppliers]));
        assert_eq!(gate.render(&[PermissionName::ViewSuppliers], "table", None), None);
        assert_eq!(
            gate.render(&[PermissionName::ViewSuppliers], "table", Some("no access")),
            Some("no access")
        );
    }

    #[tokio::test]
    async fn test_invalidate_during_fetch_keeps_cache_empty() {
        let (mock, gate) = setup();
        let gate = Arc::new(gate);
        mock.on_delayed(
            HttpMethod::Get,
            "/roles/manager/permissions",
            Duration::from_millis(40),
            200,
            json!([binding("delete_user")]),
        );

        let pending = {
            let g = gate.clone();
            tokio::spawn(async move { g.resolve("manager").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        gate.invalidate();
        pending.await.unwrap().unwrap();

        assert_eq!(gate.cached_role(), None);
        assert!(!gate.has_any(&[PermissionName::DeleteUser]));

        // a fresh resolve after the invalidation caches normally
        gate.resolve("manager").await.unwrap();
        assert!(gate.has_any(&[PermissionName::DeleteUser]));
    }

    #[test]
    fn test_nothing_resolved_denies() {
        let (_mock, gate) = setup();
        assert!(gate.permissions().is_empty());
        assert!(!gate.has_any(&[PermissionName::ViewRoles]));
    }
}
