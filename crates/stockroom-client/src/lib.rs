//! # stockroom-client: REST Client and Client-Side State
//!
//! Talks to the inventory REST API and keeps what came back: cached pages,
//! request lifecycle, the signed-in session and its permissions.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Client Architecture                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    Dashboard (composition root)                  │  │
//! │  │                                                                  │  │
//! │  │  Owns one ApiClient and one ResourceStore                        │  │
//! │  │  Clears all state when the session ends                          │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ SessionManager │  │ PermissionGate │  │  ListingController<T>  │    │
//! │  │                │  │                │  │                        │    │
//! │  │ login, lock,   │  │ role → set     │  │ page, page size,       │    │
//! │  │ unlock, logout │  │ cached, fails  │  │ delete reconciliation, │    │
//! │  │ boot hints     │  │ closed         │  │ search                 │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │   RoleAdmin    │  │ RequestControl │  │    ResourceStore       │    │
//! │  │                │  │                │  │                        │    │
//! │  │ grant, revoke, │  │ idle/loading/  │  │ one slice per entity,  │    │
//! │  │ superadmin     │  │ success/error  │  │ stale responses        │    │
//! │  │ protected      │  │ per request    │  │ dropped                │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ApiClient ──► dyn Transport ──► HttpTransport (reqwest)               │
//! │                              └─► MockTransport (tests)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`dashboard`] - `Dashboard` composition root
//! - [`api`] - Typed endpoint calls over a [`Transport`]
//! - [`transport`] - HTTP transport and the request/response pair
//! - [`request`] - Per-request lifecycle tracking
//! - [`store`] - Resource store slices
//! - [`listing`] - Pagination coordinator for one table
//! - [`gate`] - Permission gate
//! - [`roles`] - Role and permission administration
//! - [`session`] - Session and credential manager
//! - [`storage`] - Persisted boot hints
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Client error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_client::{ClientConfig, Dashboard};
//! use stockroom_core::Supplier;
//!
//! let dashboard = Dashboard::new(ClientConfig::load(None)?)?;
//! dashboard.login("ada@acme.test", "correct horse").await?;
//!
//! let suppliers = dashboard.listing::<Supplier>()?;
//! let page = dashboard.settle(suppliers.refresh().await)?;
//! println!("{} of {}", page.items().len(), page.total_count());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gate;
pub mod listing;
pub mod request;
pub mod roles;
pub mod session;
pub mod storage;
pub mod store;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::ApiClient;
pub use config::ClientConfig;
pub use dashboard::Dashboard;
pub use error::{ClientError, ClientResult};
pub use gate::PermissionGate;
pub use listing::ListingController;
pub use request::RequestController;
pub use roles::RoleAdmin;
pub use session::SessionManager;
pub use storage::{BootHints, FileStorage, LocalStorage, MemoryStorage};
pub use store::{ResourceStore, StoreSlot};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, Transport};
