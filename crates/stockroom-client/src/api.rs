//! # REST API Client
//!
//! Typed calls for every endpoint the dashboard uses.
//!
//! ## Response Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Status → Outcome                                  │
//! │                                                                         │
//! │  2xx  ──► body parsed into the endpoint's type                         │
//! │           (delete/grant/revoke: literal success message)               │
//! │                                                                         │
//! │  401  ──► ClientError::AuthExpired (login/register: Server{401})      │
//! │                                                                         │
//! │  else ──► ClientError::Server { status, message }                      │
//! │           message = {"error"} | {"message"} | plain text | generic     │
//! │                                                                         │
//! │  no response ──► ClientError::Network                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The client holds the current access token and attaches it as
//! `Authorization: Bearer` to every call except login and register.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use stockroom_core::contract::{
    AuthResponse, CreateRoleRequest, ErrorBody, LoginRequest, LogoutRequest, PageEnvelope,
    RegisterRequest, ResourceDraft,
};
use stockroom_core::{
    PageState, PaginatedCollection, Permission, PermissionName, Resource, ResourceKind, Role,
    RolePermission,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    access_token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        ApiClient {
            transport,
            access_token: RwLock::new(None),
        }
    }

    /// Builds a client over the real HTTP transport.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|guard| guard.clone())
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Sends a request and maps non-2xx statuses to errors.
    async fn execute(&self, request: ApiRequest, authenticated: bool) -> ClientResult<ApiResponse> {
        let request = match self.token() {
            Some(token) if authenticated => request.bearer(token),
            _ => request,
        };

        let method = request.method;
        let path = request.path();
        let started = Instant::now();
        let response = self.transport.send(request).await.map_err(|e| {
            warn!(%method, %path, error = %e, "Request failed before a response");
            e
        })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(%method, %path, status = response.status, elapsed_ms, "Response received");

        if response.is_success() {
            return Ok(response);
        }
        if response.status == 401 && authenticated {
            return Err(ClientError::AuthExpired);
        }
        Err(ClientError::Server {
            status: response.status,
            message: server_message(&response),
        })
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        authenticated: bool,
    ) -> ClientResult<T> {
        let response = self.execute(request, authenticated).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// For endpoints that answer with a literal success string.
    async fn execute_message(&self, request: ApiRequest, fallback: &str) -> ClientResult<String> {
        let response = self.execute(request, true).await?;
        Ok(success_message(&response.body).unwrap_or_else(|| fallback.to_string()))
    }

    // =========================================================================
    // Auth
    // =========================================================================

    pub async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        let req = ApiRequest::post(["auth", "login"]).json(serde_json::to_value(request)?);
        self.execute_json(req, false).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        let req = ApiRequest::post(["auth", "register"]).json(serde_json::to_value(request)?);
        self.execute_json(req, false).await
    }

    /// Invalidates the refresh token server-side.
    pub async fn logout(&self, refresh_token: &str) -> ClientResult<String> {
        let body = LogoutRequest {
            refresh_token: refresh_token.to_string(),
        };
        let req = ApiRequest::post(["auth", "logout"]).json(serde_json::to_value(&body)?);
        self.execute_message(req, "Logged out").await
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// `GET /{resource}?page=&pageSize=`.
    pub async fn list<T: Resource>(&self, state: PageState) -> ClientResult<PaginatedCollection<T>> {
        let query = state.to_query();
        let req = ApiRequest::get([T::KIND.path()])
            .query("page", query.page)
            .query("pageSize", query.page_size);
        let root: Value = self.execute_json(req, true).await?;
        let envelope = take_envelope::<T>(root, T::KIND)?;
        Ok(PaginatedCollection::from_envelope(envelope, state)?)
    }

    /// `GET /{resource}/search?search=`. Returns a flat list.
    pub async fn search<T: Resource>(&self, query: &str) -> ClientResult<Vec<T>> {
        let req = ApiRequest::get([T::KIND.path(), "search"]).query("search", query);
        self.execute_json(req, true).await
    }

    pub async fn get<T: Resource>(&self, id: &str) -> ClientResult<T> {
        self.execute_json(ApiRequest::get([T::KIND.path(), id]), true)
            .await
    }

    pub async fn create<D: ResourceDraft>(&self, draft: &D) -> ClientResult<D::Target> {
        let kind = <D::Target as Resource>::KIND;
        let req = ApiRequest::post([kind.path()]).json(draft.to_body()?);
        self.execute_json(req, true).await
    }

    pub async fn update<D: ResourceDraft>(&self, id: &str, draft: &D) -> ClientResult<D::Target> {
        let kind = <D::Target as Resource>::KIND;
        let req = ApiRequest::put([kind.path(), id]).json(draft.to_body()?);
        self.execute_json(req, true).await
    }

    /// `DELETE /{resource}/{id}`. Returns the server's success message.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> ClientResult<String> {
        let fallback = format!("{} deleted successfully", kind.label());
        self.execute_message(ApiRequest::delete([kind.path(), id]), &fallback)
            .await
    }

    // =========================================================================
    // Roles & Permissions
    // =========================================================================

    pub async fn roles(&self) -> ClientResult<Vec<Role>> {
        self.execute_json(ApiRequest::get(["roles"]), true).await
    }

    pub async fn create_role(&self, request: &CreateRoleRequest) -> ClientResult<Role> {
        let req = ApiRequest::post(["roles"]).json(serde_json::to_value(request)?);
        self.execute_json(req, true).await
    }

    pub async fn delete_role(&self, role: &str) -> ClientResult<String> {
        self.execute_message(ApiRequest::delete(["roles", role]), "Role deleted successfully")
            .await
    }

    pub async fn role_permissions(&self, role: &str) -> ClientResult<Vec<RolePermission>> {
        self.execute_json(ApiRequest::get(["roles", role, "permissions"]), true)
            .await
    }

    pub async fn grant_permission(&self, role: &str, permission: PermissionName) -> ClientResult<String> {
        self.execute_message(
            ApiRequest::post(["roles", role, permission.as_str()]),
            "Permission granted",
        )
        .await
    }

    pub async fn revoke_permission(&self, role: &str, permission: PermissionName) -> ClientResult<String> {
        self.execute_message(
            ApiRequest::delete(["roles", role, permission.as_str()]),
            "Permission revoked",
        )
        .await
    }

    /// The business's full permission catalog.
    pub async fn permissions(&self) -> ClientResult<Vec<Permission>> {
        self.execute_json(ApiRequest::get(["permissions"]), true)
            .await
    }
}

// =============================================================================
// Body Helpers
// =============================================================================

/// Reads the pagination envelope nested under the collection key.
///
/// A body that is itself the envelope (has `items` at the root) is accepted.
fn take_envelope<T: Resource>(root: Value, kind: ResourceKind) -> ClientResult<PageEnvelope<T>> {
    let envelope = match root {
        Value::Object(mut map) => match map.remove(kind.collection_key()) {
            Some(inner) => inner,
            None if map.contains_key("items") => Value::Object(map),
            None => {
                return Err(ClientError::MalformedResponse(format!(
                    "expected '{}' in list response",
                    kind.collection_key()
                )))
            }
        },
        other => {
            return Err(ClientError::MalformedResponse(format!(
                "expected an object, got {}",
                json_kind(&other)
            )))
        }
    };
    Ok(serde_json::from_value(envelope)?)
}

/// The server's error text, or a generic line naming the status.
fn server_message(response: &ApiResponse) -> String {
    let body = response.body.trim();
    if body.is_empty() {
        return format!("Request failed with status {}", response.status);
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        return match parsed {
            Value::String(s) if !s.trim().is_empty() => s,
            Value::Object(_) => serde_json::from_value::<ErrorBody>(parsed)
                .ok()
                .and_then(ErrorBody::text)
                .unwrap_or_else(|| format!("Request failed with status {}", response.status)),
            _ => format!("Request failed with status {}", response.status),
        };
    }
    body.to_string()
}

/// Success text from a plain-text, JSON-string or `{"message"}` body.
fn success_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(s)) => Some(s),
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::HttpMethod;
    use serde_json::json;
    use stockroom_core::contract::SupplierDraft;
    use stockroom_core::{Supplier, User};

    fn client() -> (Arc<MockTransport>, ApiClient) {
        let mock = Arc::new(MockTransport::new());
        let api = ApiClient::new(mock.clone());
        (mock, api)
    }

    fn supplier(id: &str, name: &str) -> Value {
        json!({ "id": id, "name": name })
    }

    #[tokio::test]
    async fn test_list_reads_nested_envelope_and_sends_one_based_page() {
        let (mock, api) = client();
        mock.on_json(
            HttpMethod::Get,
            "/suppliers",
            200,
            json!({ "suppliers": {
                "items": [supplier("s-21", "Acme"), supplier("s-22", "Globex")],
                "totalCount": 22, "currentPage": 3, "pageSize": 10
            }}),
        );

        let mut state = PageState::first(10).unwrap();
        state.set_page(2);
        let page: PaginatedCollection<Supplier> = api.list(state).await.unwrap();

        assert_eq!(page.page(), 2);
        assert_eq!(page.total_count(), 22);
        assert_eq!(page.items()[1].name, "Globex");

        let sent = &mock.requests()[0];
        assert_eq!(
            sent.query,
            vec![
                ("page".to_string(), "3".to_string()),
                ("pageSize".to_string(), "10".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_list_with_missing_key_is_malformed() {
        let (mock, api) = client();
        mock.on_json(HttpMethod::Get, "/users", 200, json!({ "people": [] }));
        let err = api.list::<User>(PageState::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_search_empty_is_empty_vec() {
        let (mock, api) = client();
        mock.on_json(HttpMethod::Get, "/suppliers/search", 200, json!([]));
        let found: Vec<Supplier> = api.search("acme").await.unwrap();
        assert!(found.is_empty());
        assert_eq!(
            mock.requests()[0].query,
            vec![("search".to_string(), "acme".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delete_accepts_plain_text_and_json_string() {
        let (mock, api) = client();
        mock.on(HttpMethod::Delete, "/suppliers/s-1", 200, "Supplier deleted successfully");
        mock.on(HttpMethod::Delete, "/suppliers/s-2", 200, "\"Gone\"");
        mock.on(HttpMethod::Delete, "/suppliers/s-3", 204, "");

        assert_eq!(
            api.delete(ResourceKind::Suppliers, "s-1").await.unwrap(),
            "Supplier deleted successfully"
        );
        assert_eq!(api.delete(ResourceKind::Suppliers, "s-2").await.unwrap(), "Gone");
        assert_eq!(
            api.delete(ResourceKind::Suppliers, "s-3").await.unwrap(),
            "Supplier deleted successfully"
        );
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let (mock, api) = client();
        mock.on_json(HttpMethod::Get, "/suppliers/a", 404, json!({ "error": "Supplier not found" }));
        mock.on_json(HttpMethod::Get, "/suppliers/b", 400, json!({ "message": "Bad id" }));
        mock.on(HttpMethod::Get, "/suppliers/c", 500, "upstream exploded");
        mock.on(HttpMethod::Get, "/suppliers/d", 502, "");
        mock.on(HttpMethod::Get, "/suppliers/e", 401, "");
        mock.on_unreachable(HttpMethod::Get, "/suppliers/f");

        let message = |e: ClientError| match e {
            ClientError::Server { message, .. } => message,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(message(api.get::<Supplier>("a").await.unwrap_err()), "Supplier not found");
        assert_eq!(message(api.get::<Supplier>("b").await.unwrap_err()), "Bad id");
        assert_eq!(message(api.get::<Supplier>("c").await.unwrap_err()), "upstream exploded");
        assert_eq!(
            message(api.get::<Supplier>("d").await.unwrap_err()),
            "Request failed with status 502"
        );
        assert!(matches!(
            api.get::<Supplier>("e").await.unwrap_err(),
            ClientError::AuthExpired
        ));
        assert!(matches!(
            api.get::<Supplier>("f").await.unwrap_err(),
            ClientError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_bearer_only_on_authenticated_calls() {
        let (mock, api) = client();
        api.set_access_token(Some("access-1".into()));
        mock.on_json(HttpMethod::Get, "/roles", 200, json!([]));
        mock.on(HttpMethod::Post, "/auth/login", 401, "");

        api.roles().await.unwrap();
        let err = api
            .login(&LoginRequest::new("a@b.test", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 401, .. }));

        let sent = mock.requests();
        assert_eq!(sent[0].bearer.as_deref(), Some("access-1"));
        assert_eq!(sent[1].bearer, None);
    }

    #[tokio::test]
    async fn test_create_sends_compacted_body() {
        let (mock, api) = client();
        mock.on_json(HttpMethod::Post, "/suppliers", 201, supplier("s-9", "Acme"));
        let draft = SupplierDraft {
            name: "Acme".into(),
            email: Some(" ".into()),
            ..Default::default()
        };
        let created = api.create(&draft).await.unwrap();
        assert_eq!(created.id, "s-9");
        assert_eq!(mock.requests()[0].body, Some(json!({ "name": "Acme" })));
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let (mock, api) = client();
        mock.on(HttpMethod::Get, "/roles", 200, "<html>");
        assert!(matches!(
            api.roles().await.unwrap_err(),
            ClientError::MalformedResponse(_)
        ));
    }
}
