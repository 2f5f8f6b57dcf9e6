//! # Resource Store
//!
//! The authoritative client-side copy of every server collection.
//!
//! ## Slices
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ResourceStore                                  │
//! │                                                                         │
//! │  suppliers ─┐                                                          │
//! │  receivers  │   Slice<T> {                                             │
//! │  products   │     listing:  Option<PaginatedCollection<T>>  None = not │
//! │  inventories├──►  search:   Option<Vec<T>>                    loaded   │
//! │  inbound    │     selected: Option<id>                                 │
//! │  outbound   │     issued / applied sequence numbers                    │
//! │  users     ─┘   }                                                      │
//! │                                                                         │
//! │  roles            Option<Vec<Role>>                                    │
//! │  catalog          Option<Vec<Permission>>                              │
//! │  role_permissions role → Vec<RolePermission>                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Fields are replaced whole. Nothing hands out a `&mut` into a slice.
//! - A listing or search response lands only if its sequence number is
//!   newer than the last one applied to that slice.
//! - The selected id is cleared when the row is deleted or the listing is
//!   replaced.
//! - Locks are never held across `.await`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use stockroom_core::{
    InboundOrder, Inventory, OutboundOrder, PageState, PaginatedCollection, Permission, Product,
    Receiver, Resource, Role, RolePermission, Supplier, User,
};

// =============================================================================
// Slice
// =============================================================================

/// Client-side state for one resource kind.
#[derive(Debug, Clone)]
pub struct Slice<T> {
    listing: Option<PaginatedCollection<T>>,
    search: Option<Vec<T>>,
    selected: Option<String>,
    issued: u64,
    applied_listing: u64,
    applied_search: u64,
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Slice {
            listing: None,
            search: None,
            selected: None,
            issued: 0,
            applied_listing: 0,
            applied_search: 0,
        }
    }
}

impl<T: Resource> Slice<T> {
    fn find(&self, id: &str) -> Option<&T> {
        self.listing
            .as_ref()
            .and_then(|page| page.items().iter().find(|item| item.id() == id))
            .or_else(|| {
                self.search
                    .as_ref()
                    .and_then(|rows| rows.iter().find(|item| item.id() == id))
            })
    }
}

/// A resource type with a slice in the store.
pub trait StoreSlot: Resource {
    fn slot(store: &ResourceStore) -> &RwLock<Slice<Self>>;
}

macro_rules! store_slot {
    ($ty:ty, $field:ident) => {
        impl StoreSlot for $ty {
            fn slot(store: &ResourceStore) -> &RwLock<Slice<Self>> {
                &store.$field
            }
        }
    };
}

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
pub struct ResourceStore {
    suppliers: RwLock<Slice<Supplier>>,
    receivers: RwLock<Slice<Receiver>>,
    products: RwLock<Slice<Product>>,
    inventories: RwLock<Slice<Inventory>>,
    inbound_orders: RwLock<Slice<InboundOrder>>,
    outbound_orders: RwLock<Slice<OutboundOrder>>,
    users: RwLock<Slice<User>>,
    roles: RwLock<Option<Vec<Role>>>,
    catalog: RwLock<Option<Vec<Permission>>>,
    role_permissions: RwLock<HashMap<String, Vec<RolePermission>>>,
}

store_slot!(Supplier, suppliers);
store_slot!(Receiver, receivers);
store_slot!(Product, products);
store_slot!(Inventory, inventories);
store_slot!(InboundOrder, inbound_orders);
store_slot!(OutboundOrder, outbound_orders);
store_slot!(User, users);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Resource Slices
    // =========================================================================

    /// Current page, or `None` if never loaded.
    pub fn listing<T: StoreSlot>(&self) -> Option<PaginatedCollection<T>> {
        read(T::slot(self)).listing.clone()
    }

    /// Search results, or `None` when not searching.
    pub fn search_results<T: StoreSlot>(&self) -> Option<Vec<T>> {
        read(T::slot(self)).search.clone()
    }

    pub fn selected_id<T: StoreSlot>(&self) -> Option<String> {
        read(T::slot(self)).selected.clone()
    }

    /// The selected row, looked up in the listing then the search results.
    pub fn selected<T: StoreSlot>(&self) -> Option<T> {
        let slice = read(T::slot(self));
        let id = slice.selected.as_deref()?;
        slice.find(id).cloned()
    }

    pub fn select<T: StoreSlot>(&self, id: Option<String>) {
        write(T::slot(self)).selected = id;
    }

    /// Reserves a sequence number for a listing or search fetch.
    pub fn begin_fetch<T: StoreSlot>(&self) -> u64 {
        let mut slice = write(T::slot(self));
        slice.issued += 1;
        slice.issued
    }

    /// Replaces the listing if `seq` is newer than the last applied one.
    pub fn apply_listing<T: StoreSlot>(&self, seq: u64, page: PaginatedCollection<T>) -> bool {
        let mut slice = write(T::slot(self));
        if seq <= slice.applied_listing {
            debug!(kind = %T::KIND, seq, applied = slice.applied_listing, "Dropping stale listing");
            return false;
        }
        slice.applied_listing = seq;
        slice.listing = Some(page);
        slice.selected = None;
        true
    }

    /// After a failed fetch: an explicit empty page if nothing was loaded yet.
    pub fn apply_failed_listing<T: StoreSlot>(&self, seq: u64, state: PageState) -> bool {
        let mut slice = write(T::slot(self));
        if seq <= slice.applied_listing || slice.listing.is_some() {
            return false;
        }
        slice.applied_listing = seq;
        slice.listing = Some(PaginatedCollection::empty(state));
        true
    }

    pub fn apply_search<T: StoreSlot>(&self, seq: u64, rows: Vec<T>) -> bool {
        let mut slice = write(T::slot(self));
        if seq <= slice.applied_search {
            debug!(kind = %T::KIND, seq, applied = slice.applied_search, "Dropping stale search");
            return false;
        }
        slice.applied_search = seq;
        slice.search = Some(rows);
        true
    }

    /// Leaves search mode.
    pub fn clear_search<T: StoreSlot>(&self) {
        let mut slice = write(T::slot(self));
        slice.applied_search = slice.issued;
        slice.search = None;
    }

    /// Drops a deleted row from the listing and search results.
    ///
    /// Returns the listing's remaining total, if a listing is loaded.
    pub fn remove<T: StoreSlot>(&self, id: &str) -> Option<usize> {
        let mut slice = write(T::slot(self));
        let mut listing = slice.listing.take();
        if let Some(page) = listing.as_mut() {
            page.remove_where(|item| item.id() == id);
        }
        let total = listing.as_ref().map(PaginatedCollection::total_count);
        slice.listing = listing;

        if let Some(rows) = slice.search.take() {
            slice.search = Some(rows.into_iter().filter(|item| item.id() != id).collect());
        }
        if slice.selected.as_deref() == Some(id) {
            slice.selected = None;
        }
        total
    }

    /// Replaces a row wherever it appears. Returns false if it appears nowhere.
    pub fn upsert<T: StoreSlot>(&self, item: T) -> bool {
        let mut slice = write(T::slot(self));
        let id = item.id().to_string();
        let mut found = false;

        if let Some(mut page) = slice.listing.take() {
            found |= page.replace_where(|row| row.id() == id, item.clone());
            slice.listing = Some(page);
        }
        if let Some(rows) = slice.search.take() {
            let rows: Vec<T> = rows
                .into_iter()
                .map(|row| {
                    if row.id() == id {
                        found = true;
                        item.clone()
                    } else {
                        row
                    }
                })
                .collect();
            slice.search = Some(rows);
        }
        found
    }

    pub fn clear_slice<T: StoreSlot>(&self) {
        let mut slice = write(T::slot(self));
        let issued = slice.issued;
        *slice = Slice {
            issued,
            applied_listing: issued,
            applied_search: issued,
            ..Slice::default()
        };
    }

    // =========================================================================
    // Roles & Permissions
    // =========================================================================

    pub fn roles(&self) -> Option<Vec<Role>> {
        read(&self.roles).clone()
    }

    pub fn set_roles(&self, roles: Vec<Role>) {
        *write(&self.roles) = Some(roles);
    }

    pub fn catalog(&self) -> Option<Vec<Permission>> {
        read(&self.catalog).clone()
    }

    pub fn set_catalog(&self, catalog: Vec<Permission>) {
        *write(&self.catalog) = Some(catalog);
    }

    pub fn role_permissions(&self, role: &str) -> Option<Vec<RolePermission>> {
        read(&self.role_permissions).get(role).cloned()
    }

    pub fn set_role_permissions(&self, role: &str, bindings: Vec<RolePermission>) {
        write(&self.role_permissions).insert(role.to_string(), bindings);
    }

    /// Forgets a deleted role everywhere.
    pub fn remove_role(&self, role: &str) {
        if let Some(roles) = write(&self.roles).as_mut() {
            roles.retain(|r| r.name != role);
        }
        write(&self.role_permissions).remove(role);
    }

    // =========================================================================
    // Session End
    // =========================================================================

    /// Drops everything. Responses still in flight are discarded on arrival.
    pub fn clear(&self) {
        self.clear_slice::<Supplier>();
        self.clear_slice::<Receiver>();
        self.clear_slice::<Product>();
        self.clear_slice::<Inventory>();
        self.clear_slice::<InboundOrder>();
        self.clear_slice::<OutboundOrder>();
        self.clear_slice::<User>();
        *write(&self.roles) = None;
        *write(&self.catalog) = None;
        write(&self.role_permissions).clear();
    }
}
