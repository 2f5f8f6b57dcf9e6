//! # stockroom-core: Pure State Contracts for Stockroom
//!
//! Everything the dashboard knows about its data, expressed as plain types
//! and pure functions. No I/O happens in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stockroom Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockroom console (apps/console)                │   │
//! │  │     login ──► list/search ──► delete ──► roles/perms           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockroom-client                             │   │
//! │  │  RequestController, ResourceStore, PermissionGate, Session     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ stockroom-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌────────────┐ ┌────────────┐ ┌──────────┐     │   │
//! │  │   │  types   │ │ pagination │ │ permission │ │ session  │     │   │
//! │  │   │ Supplier │ │ PageState  │ │ PermSet    │ │ Machine  │     │   │
//! │  │   │ Product  │ │ Collection │ │ gate()     │ │ guard()  │     │   │
//! │  │   └──────────┘ └────────────┘ └────────────┘ └──────────┘     │   │
//! │  │   ┌──────────┐ ┌────────────┐ ┌────────────┐                  │   │
//! │  │   │ contract │ │  request   │ │ validation │                  │   │
//! │  │   └──────────┘ └────────────┘ └────────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO TIMERS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Inventory entities and [`ResourceKind`]
//! - [`contract`] - REST request/response bodies
//! - [`pagination`] - Page math and cached pages
//! - [`permission`] - Permission catalog, sets and the gate predicate
//! - [`request`] - Request lifecycle state
//! - [`session`] - Session state machine and route guard
//! - [`validation`] - Form field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::pagination::PageState;
//!
//! let mut state = PageState::first(10).unwrap();
//! state.set_page(2);
//!
//! // 25 rows, 10 per page: three pages, page index 2 is the last
//! assert_eq!(state.page_count(25), 3);
//! assert!(!state.is_out_of_range(25));
//!
//! // after deleting down to 20 rows the last page is gone
//! assert!(state.is_out_of_range(20));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod contract;
pub mod error;
pub mod pagination;
pub mod permission;
pub mod request;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use pagination::{PageQuery, PageState, PaginatedCollection};
pub use permission::{
    Permission, PermissionName, PermissionSet, Role, RolePermission, SUPERADMIN_ROLE,
};
pub use request::{RequestState, RequestStatus};
pub use session::{
    Address, Business, RouteAccess, RouteDecision, Session, SessionMachine, SessionPhase,
    SessionUser,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Rows per page when a listing is first shown.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: usize = 100;

