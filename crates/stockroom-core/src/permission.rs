//! # Permissions and Roles
//!
//! The permission catalog and the rules for evaluating a role's set.
//!
//! ## Evaluation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    has_any(required)                                    │
//! │                                                                         │
//! │  required = { DeleteSupplier, UpdateSupplier }                         │
//! │  held     = { ViewSuppliers, UpdateSupplier }                          │
//! │                                                                         │
//! │  required ∩ held = { UpdateSupplier }  →  non-empty  →  VISIBLE        │
//! │                                                                         │
//! │  required = {}                          →  HIDDEN (fail closed)        │
//! │  held     = {} (fetch failed)           →  HIDDEN (fail closed)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is a display gate only. The REST API remains the authority on what
//! a caller may do; hiding a button is not a security boundary.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Name of the built-in role whose permission set cannot be edited.
pub const SUPERADMIN_ROLE: &str = "superadmin";

// =============================================================================
// Permission Catalog
// =============================================================================

/// Every permission the dashboard knows how to gate on.
///
/// ## Wire Format
/// Serialized as snake_case strings (`"create_supplier"`), which is the
/// `permissionName` the REST API returns for a role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PermissionName {
    ViewSuppliers,
    CreateSupplier,
    UpdateSupplier,
    DeleteSupplier,

    ViewReceivers,
    CreateReceiver,
    UpdateReceiver,
    DeleteReceiver,

    ViewProducts,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,

    ViewInventories,
    CreateInventory,
    UpdateInventory,
    DeleteInventory,

    ViewInboundOrders,
    CreateInboundOrder,
    UpdateInboundOrder,
    DeleteInboundOrder,

    ViewOutboundOrders,
    CreateOutboundOrder,
    UpdateOutboundOrder,
    DeleteOutboundOrder,

    ViewUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,

    ViewRoles,
    CreateRole,
    DeleteRole,
    ManageRolePermissions,
    ViewPermissions,
}

impl PermissionName {
    /// The full catalog.
    pub const ALL: [PermissionName; 33] = [
        PermissionName::ViewSuppliers,
        PermissionName::CreateSupplier,
        PermissionName::UpdateSupplier,
        PermissionName::DeleteSupplier,
        PermissionName::ViewReceivers,
        PermissionName::CreateReceiver,
        PermissionName::UpdateReceiver,
        PermissionName::DeleteReceiver,
        PermissionName::ViewProducts,
        PermissionName::CreateProduct,
        PermissionName::UpdateProduct,
        PermissionName::DeleteProduct,
        PermissionName::ViewInventories,
        PermissionName::CreateInventory,
        PermissionName::UpdateInventory,
        PermissionName::DeleteInventory,
        PermissionName::ViewInboundOrders,
        PermissionName::CreateInboundOrder,
        PermissionName::UpdateInboundOrder,
        PermissionName::DeleteInboundOrder,
        PermissionName::ViewOutboundOrders,
        PermissionName::CreateOutboundOrder,
        PermissionName::UpdateOutboundOrder,
        PermissionName::DeleteOutboundOrder,
        PermissionName::ViewUsers,
        PermissionName::CreateUser,
        PermissionName::UpdateUser,
        PermissionName::DeleteUser,
        PermissionName::ViewRoles,
        PermissionName::CreateRole,
        PermissionName::DeleteRole,
        PermissionName::ManageRolePermissions,
        PermissionName::ViewPermissions,
    ];

    /// Wire name, identical to the serde representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PermissionName::ViewSuppliers => "view_suppliers",
            PermissionName::CreateSupplier => "create_supplier",
            PermissionName::UpdateSupplier => "update_supplier",
            PermissionName::DeleteSupplier => "delete_supplier",
            PermissionName::ViewReceivers => "view_receivers",
            PermissionName::CreateReceiver => "create_receiver",
            PermissionName::UpdateReceiver => "update_receiver",
            PermissionName::DeleteReceiver => "delete_receiver",
            PermissionName::ViewProducts => "view_products",
            PermissionName::CreateProduct => "create_product",
            PermissionName::UpdateProduct => "update_product",
            PermissionName::DeleteProduct => "delete_product",
            PermissionName::ViewInventories => "view_inventories",
            PermissionName::CreateInventory => "create_inventory",
            PermissionName::UpdateInventory => "update_inventory",
            PermissionName::DeleteInventory => "delete_inventory",
            PermissionName::ViewInboundOrders => "view_inbound_orders",
            PermissionName::CreateInboundOrder => "create_inbound_order",
            PermissionName::UpdateInboundOrder => "update_inbound_order",
            PermissionName::DeleteInboundOrder => "delete_inbound_order",
            PermissionName::ViewOutboundOrders => "view_outbound_orders",
            PermissionName::CreateOutboundOrder => "create_outbound_order",
            PermissionName::UpdateOutboundOrder => "update_outbound_order",
            PermissionName::DeleteOutboundOrder => "delete_outbound_order",
            PermissionName::ViewUsers => "view_users",
            PermissionName::CreateUser => "create_user",
            PermissionName::UpdateUser => "update_user",
            PermissionName::DeleteUser => "delete_user",
            PermissionName::ViewRoles => "view_roles",
            PermissionName::CreateRole => "create_role",
            PermissionName::DeleteRole => "delete_role",
            PermissionName::ManageRolePermissions => "manage_role_permissions",
            PermissionName::ViewPermissions => "view_permissions",
        }
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PermissionName::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CoreError::UnknownPermission(s.to_string()))
    }
}

// =============================================================================
// Catalog and Role Records
// =============================================================================

/// An entry of the global permission catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    #[serde(default)]
    pub business_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A permission bound to a role.
///
/// `permission_name` stays a raw string on the wire so an unknown name
/// from a newer server does not fail the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub permission_id: String,
    pub permission_name: String,
    #[serde(default)]
    pub permission_description: Option<String>,
}

impl RolePermission {
    /// The catalog entry this binding refers to, if known.
    pub fn name(&self) -> Option<PermissionName> {
        self.permission_name.parse().ok()
    }
}

/// A named bundle of permissions assigned to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    pub fn is_reserved(&self) -> bool {
        is_reserved_role(&self.name)
    }
}

/// Returns true for the built-in role whose permission set is immutable.
pub fn is_reserved_role(role: &str) -> bool {
    role.trim().eq_ignore_ascii_case(SUPERADMIN_ROLE)
}

/// Rejects mutations of reserved roles before a request is issued.
///
/// ## Example
/// ```rust
/// use stockroom_core::permission::ensure_mutable_role;
///
/// assert!(ensure_mutable_role("warehouse").is_ok());
/// assert!(ensure_mutable_role("superadmin").is_err());
/// assert!(ensure_mutable_role("SuperAdmin").is_err());
/// ```
pub fn ensure_mutable_role(role: &str) -> CoreResult<()> {
    if is_reserved_role(role) {
        return Err(CoreError::ReservedRole {
            role: role.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Permission Set
// =============================================================================

/// The resolved permissions of one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    names: BTreeSet<PermissionName>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a role's bindings.
    ///
    /// ## Returns
    /// The set plus the raw names that are not in the catalog. Callers log
    /// those; they never grant anything.
    pub fn from_role_permissions(bindings: &[RolePermission]) -> (Self, Vec<String>) {
        let mut set = PermissionSet::new();
        let mut unknown = Vec::new();
        for binding in bindings {
            match binding.name() {
                Some(name) => {
                    set.names.insert(name);
                }
                None => unknown.push(binding.permission_name.clone()),
            }
        }
        (set, unknown)
    }

    pub fn insert(&mut self, name: PermissionName) -> bool {
        self.names.insert(name)
    }

    pub fn remove(&mut self, name: PermissionName) -> bool {
        self.names.remove(&name)
    }

    pub fn contains(&self, name: PermissionName) -> bool {
        self.names.contains(&name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PermissionName> + '_ {
        self.names.iter().copied()
    }

    /// OR across `required`. An empty requirement list denies.
    pub fn has_any(&self, required: &[PermissionName]) -> bool {
        required.iter().any(|p| self.names.contains(p))
    }

    /// AND across `required`. An empty requirement list denies.
    pub fn has_all(&self, required: &[PermissionName]) -> bool {
        !required.is_empty() && required.iter().all(|p| self.names.contains(p))
    }
}

impl FromIterator<PermissionName> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionName>>(iter: I) -> Self {
        PermissionSet {
            names: iter.into_iter().collect(),
        }
    }
}

/// Picks what to render for a gated element.
///
/// Returns `content` when `set` holds any of `required`, otherwise the
/// fallback if one was supplied, otherwise nothing. Absence of permission is
/// a normal state, not an error.
pub fn gate<T>(
    set: &PermissionSet,
    required: &[PermissionName],
    content: T,
    fallback: Option<T>,
) -> Option<T> {
    if set.has_any(required) {
        Some(content)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str) -> RolePermission {
        RolePermission {
            permission_id: format!("id-{}", name),
            permission_name: name.to_string(),
            permission_description: None,
        }
    }

    #[test]
    fn test_catalog_round_trips_through_str() {
        for p in PermissionName::ALL {
            assert_eq!(p.as_str().parse::<PermissionName>().unwrap(), p);
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
        }
    }

    #[test]
    fn test_has_any_is_or() {
        let set: PermissionSet = [PermissionName::ViewSuppliers, PermissionName::UpdateSupplier]
            .into_iter()
            .collect();

        assert!(set.has_any(&[PermissionName::DeleteSupplier, PermissionName::UpdateSupplier]));
        assert!(!set.has_any(&[PermissionName::DeleteSupplier]));
        assert!(set.has_all(&[PermissionName::ViewSuppliers, PermissionName::UpdateSupplier]));
        assert!(!set.has_all(&[PermissionName::ViewSuppliers, PermissionName::DeleteSupplier]));
    }

    #[test]
    fn test_empty_requirement_denies() {
        let set: PermissionSet = PermissionName::ALL.into_iter().collect();
        assert!(!set.has_any(&[]));
        assert!(!set.has_all(&[]));
    }

    #[test]
    fn test_unknown_names_are_reported_not_granted() {
        let (set, unknown) = PermissionSet::from_role_permissions(&[
            binding("view_products"),
            binding("launch_rockets"),
        ]);
        assert_eq!(set.len(), 1);
        assert!(set.contains(PermissionName::ViewProducts));
        assert_eq!(unknown, vec!["launch_rockets".to_string()]);
    }

    #[test]
    fn test_gate_fallback() {
        let set = PermissionSet::new();
        assert_eq!(gate(&set, &[PermissionName::CreateUser], "button", None), None);
        assert_eq!(
            gate(&set, &[PermissionName::CreateUser], "button", Some("read-only")),
            Some("read-only")
        );

        let set: PermissionSet = [PermissionName::CreateUser].into_iter().collect();
        assert_eq!(
            gate(&set, &[PermissionName::CreateUser], "button", Some("read-only")),
            Some("button")
        );
    }

    #[test]
    fn test_reserved_role() {
        assert!(is_reserved_role("superadmin"));
        assert!(is_reserved_role(" SUPERADMIN "));
        assert!(!is_reserved_role("admin"));
        assert!(matches!(
            ensure_mutable_role("superadmin"),
            Err(CoreError::ReservedRole { .. })
        ));
    }
}
