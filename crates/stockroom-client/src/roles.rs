//! # Role Administration
//!
//! Listing roles, creating and deleting them, and editing which permissions
//! each role carries.
//!
//! ## Reserved Role
//! ```text
//! grant("superadmin", view_users)
//!      │
//!      ▼
//! ensure_mutable_role("superadmin") ──► Err(ReservedRole)
//!      │
//!      ╳  no request is sent
//! ```
//!
//! After any edit to the signed-in user's own role the permission gate is
//! invalidated and re-resolved, so the UI reflects the new set at once.

use std::sync::Arc;

use tracing::{info, warn};

use stockroom_core::contract::CreateRoleRequest;
use stockroom_core::permission::{ensure_mutable_role, is_reserved_role};
use stockroom_core::{CoreError, Permission, PermissionName, PermissionSet, Role, RolePermission};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::gate::PermissionGate;
use crate::request::RequestController;
use crate::store::ResourceStore;

pub struct RoleAdmin {
    api: Arc<ApiClient>,
    store: Arc<ResourceStore>,
    gate: Arc<PermissionGate>,
    roles: RequestController<Vec<Role>>,
    bindings: RequestController<Vec<RolePermission>>,
    catalog: RequestController<Vec<Permission>>,
    mutation: RequestController<String>,
}

impl RoleAdmin {
    pub fn new(api: Arc<ApiClient>, store: Arc<ResourceStore>, gate: Arc<PermissionGate>) -> Self {
        RoleAdmin {
            api,
            store,
            gate,
            roles: RequestController::new("GET /roles"),
            bindings: RequestController::new("GET /roles/{role}/permissions"),
            catalog: RequestController::new("GET /permissions"),
            mutation: RequestController::new("EDIT /roles"),
        }
    }

    pub fn mutation(&self) -> &RequestController<String> {
        &self.mutation
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn load_roles(&self) -> ClientResult<Vec<Role>> {
        let roles = self.roles.run(self.api.roles()).await?;
        self.store.set_roles(roles.clone());
        Ok(roles)
    }

    /// The global permission catalog, for the role editor.
    pub async fn load_catalog(&self) -> ClientResult<Vec<Permission>> {
        let catalog = self.catalog.run(self.api.permissions()).await?;
        self.store.set_catalog(catalog.clone());
        Ok(catalog)
    }

    pub async fn load_role_permissions(&self, role: &str) -> ClientResult<Vec<RolePermission>> {
        let bindings = self.bindings.run(self.api.role_permissions(role)).await?;
        self.store.set_role_permissions(role, bindings.clone());
        Ok(bindings)
    }

    /// The role's permissions as a set (unknown names dropped).
    pub async fn permission_set(&self, role: &str) -> ClientResult<PermissionSet> {
        let bindings = self.load_role_permissions(role).await?;
        Ok(PermissionSet::from_role_permissions(&bindings).0)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn create_role(&self, request: &CreateRoleRequest) -> ClientResult<Role> {
        request.validate()?;
        if is_reserved_role(&request.name) {
            return Err(CoreError::ReservedRole {
                role: request.name.trim().to_string(),
            }
            .into());
        }
        let mut created = None;
        self.mutation
            .run(async {
                let role = self.api.create_role(request).await?;
                let message = format!("Role {} created", role.name);
                created = Some(role);
                Ok(message)
            })
            .await?;
        let role = created.ok_or_else(|| {
            ClientError::MalformedResponse("role create returned no role".to_string())
        })?;
        info!(role = %role.name, "Role created");
        if let Err(e) = self.load_roles().await {
            warn!(error = %e, "Reload after role create failed");
        }
        Ok(role)
    }

    pub async fn delete_role(&self, role: &str) -> ClientResult<String> {
        ensure_mutable_role(role)?;
        let message = self.mutation.run(self.api.delete_role(role)).await?;
        self.store.remove_role(role);
        if self.gate.cached_role().as_deref() == Some(role) {
            self.gate.invalidate();
        }
        info!(role, "Role deleted");
        Ok(message)
    }

    pub async fn grant(&self, role: &str, permission: PermissionName) -> ClientResult<String> {
        ensure_mutable_role(role)?;
        let message = self
            .mutation
            .run(self.api.grant_permission(role, permission))
            .await?;
        info!(role, %permission, "Permission granted");
        self.after_edit(role).await;
        Ok(message)
    }

    pub async fn revoke(&self, role: &str, permission: PermissionName) -> ClientResult<String> {
        ensure_mutable_role(role)?;
        let message = self
            .mutation
            .run(self.api.revoke_permission(role, permission))
            .await?;
        info!(role, %permission, "Permission revoked");
        self.after_edit(role).await;
        Ok(message)
    }

    /// Refreshes the edited role's bindings, and the gate if it is our role.
    async fn after_edit(&self, role: &str) {
        if let Err(e) = self.load_role_permissions(role).await {
            warn!(role, error = %e, "Reload of role permissions failed");
        }
        if self.gate.cached_role().as_deref() == Some(role) {
            self.gate.invalidate();
            if let Err(e) = self.gate.resolve(role).await {
                warn!(role, error = %e, "Re-resolving own permissions failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::HttpMethod;
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, Arc<ResourceStore>, Arc<PermissionGate>, RoleAdmin) {
        let mock = Arc::new(MockTransport::new());
        let api = Arc::new(ApiClient::new(mock.clone()));
        let store = Arc::new(ResourceStore::new());
        let gate = Arc::new(PermissionGate::new(api.clone(), store.clone()));
        let admin = RoleAdmin::new(api, store.clone(), gate.clone());
        (mock, store, gate, admin)
    }

    fn binding(name: &str) -> serde_json::Value {
        json!({ "permissionId": format!("p-{}", name), "permissionName": name })
    }

    #[tokio::test]
    async fn test_superadmin_is_immutable_without_a_request() {
        let (mock, _store, _gate, admin) = setup();

        for result in [
            admin.grant("superadmin", PermissionName::ViewUsers).await,
            admin.revoke("SuperAdmin", PermissionName::ViewUsers).await,
            admin.delete_role(" superadmin ").await,
        ] {
            assert!(matches!(
                result,
                Err(ClientError::Core(CoreError::ReservedRole { .. }))
            ));
        }

        let create = admin
            .create_role(&CreateRoleRequest {
                name: "superadmin".into(),
                description: None,
            })
            .await;
        assert!(matches!(
            create,
            Err(ClientError::Core(CoreError::ReservedRole { .. }))
        ));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_role_reports_through_mutation() {
        let (mock, store, _gate, admin) = setup();
        mock.on_json(HttpMethod::Post, "/roles", 409, json!({ "error": "Role already exists" }));
        let request = CreateRoleRequest {
            name: "auditor".into(),
            description: Some("Read-only".into()),
        };

        let err = admin.create_role(&request).await.unwrap_err();
        assert_eq!(err.user_message(), "Role already exists");
        assert_eq!(
            admin.mutation().state().error.as_deref(),
            Some("Role already exists")
        );

        mock.on_json(HttpMethod::Post, "/roles", 201, json!({ "id": "r-9", "name": "auditor" }));
        mock.on_json(HttpMethod::Get, "/roles", 200, json!([{ "id": "r-9", "name": "auditor" }]));
        let role = admin.create_role(&request).await.unwrap();
        assert_eq!(role.id, "r-9");
        assert_eq!(admin.mutation().state().data.as_deref(), Some("Role auditor created"));
        assert_eq!(store.roles().map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn test_grant_then_revoke_restores_the_set() {
        let (mock, store, _gate, admin) = setup();
        let path = "/roles/clerk/permissions";
        mock.on_json(HttpMethod::Get, path, 200, json!([binding("view_products")]));
        mock.on_json(
            HttpMethod::Get,
            path,
            200,
            json!([binding("view_products"), binding("create_product")]),
        );
        mock.on_json(HttpMethod::Get, path, 200, json!([binding("view_products")]));
        mock.on(HttpMethod::Post, "/roles/clerk/create_product", 200, "Permission granted");
        mock.on(HttpMethod::Delete, "/roles/clerk/create_product", 200, "Permission revoked");

        let before = admin.permission_set("clerk").await.unwrap();

        admin.grant("clerk", PermissionName::CreateProduct).await.unwrap();
        let granted = PermissionSet::from_role_permissions(&store.role_permissions("clerk").unwrap()).0;
        assert!(granted.contains(PermissionName::CreateProduct));

        admin.revoke("clerk", PermissionName::CreateProduct).await.unwrap();
        let after = PermissionSet::from_role_permissions(&store.role_permissions("clerk").unwrap()).0;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_editing_own_role_refreshes_gate() {
        let (mock, _store, gate, admin) = setup();
        let path = "/roles/manager/permissions";
        mock.on_json(HttpMethod::Get, path, 200, json!([]));
        mock.on_json(HttpMethod::Get, path, 200, json!([binding("view_users")]));
        mock.on(HttpMethod::Post, "/roles/manager/view_users", 200, "ok");

        gate.resolve("manager").await.unwrap();
        assert!(!gate.has_any(&[PermissionName::ViewUsers]));

        admin.grant("manager", PermissionName::ViewUsers).await.unwrap();
        assert!(gate.has_any(&[PermissionName::ViewUsers]));
    }

    #[tokio::test]
    async fn test_delete_role_forgets_it() {
        let (mock, store, _gate, admin) = setup();
        mock.on_json(
            HttpMethod::Get,
            "/roles",
            200,
            json!([{ "id": "r-1", "name": "clerk" }, { "id": "r-2", "name": "manager" }]),
        );
        mock.on(HttpMethod::Delete, "/roles/clerk", 200, "Role deleted successfully");

        admin.load_roles().await.unwrap();
        admin.delete_role("clerk").await.unwrap();
        let names: Vec<String> = store.roles().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["manager".to_string()]);
    }
}
