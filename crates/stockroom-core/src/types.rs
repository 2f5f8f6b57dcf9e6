//! # Domain Types
//!
//! Entities the dashboard lists, edits and deletes.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ Supplier        │   │    Product      │   │  InboundOrder   │       │
//! │  │ Receiver        │   │   Inventory     │   │  OutboundOrder  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  name, email    │   │  sku / qty      │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Every entity flattens an `Audit` block:                               │
//! │  createdBy, updatedBy, createdAt, updatedAt                            │
//! │                                                                         │
//! │  Every entity implements `Resource`, which ties it to a `ResourceKind` │
//! │  (REST path, envelope key, permissions).                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! The resource store owns the authoritative copy of each entity. Views keep
//! only the `id` of a selected row, never a second copy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::permission::PermissionName;

// =============================================================================
// Resource Kind
// =============================================================================

/// The paginated resource collections exposed by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Suppliers,
    Receivers,
    Products,
    Inventories,
    InboundOrders,
    OutboundOrders,
    Users,
}

impl ResourceKind {
    /// All kinds, in dashboard menu order.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Suppliers,
        ResourceKind::Receivers,
        ResourceKind::Products,
        ResourceKind::Inventories,
        ResourceKind::InboundOrders,
        ResourceKind::OutboundOrders,
        ResourceKind::Users,
    ];

    /// REST path segment, e.g. `/inbound-orders`.
    pub const fn path(&self) -> &'static str {
        match self {
            ResourceKind::Suppliers => "suppliers",
            ResourceKind::Receivers => "receivers",
            ResourceKind::Products => "products",
            ResourceKind::Inventories => "inventories",
            ResourceKind::InboundOrders => "inbound-orders",
            ResourceKind::OutboundOrders => "outbound-orders",
            ResourceKind::Users => "users",
        }
    }

    /// Key under which a list endpoint nests its pagination envelope.
    ///
    /// ```json
    /// { "inboundOrders": { "items": [], "totalCount": 0, "currentPage": 1, "pageSize": 10 } }
    /// ```
    pub const fn collection_key(&self) -> &'static str {
        match self {
            ResourceKind::Suppliers => "suppliers",
            ResourceKind::Receivers => "receivers",
            ResourceKind::Products => "products",
            ResourceKind::Inventories => "inventories",
            ResourceKind::InboundOrders => "inboundOrders",
            ResourceKind::OutboundOrders => "outboundOrders",
            ResourceKind::Users => "users",
        }
    }

    /// Singular display label.
    pub const fn label(&self) -> &'static str {
        match self {
            ResourceKind::Suppliers => "Supplier",
            ResourceKind::Receivers => "Receiver",
            ResourceKind::Products => "Product",
            ResourceKind::Inventories => "Inventory",
            ResourceKind::InboundOrders => "Inbound order",
            ResourceKind::OutboundOrders => "Outbound order",
            ResourceKind::Users => "User",
        }
    }

    /// Permission needed to see the listing at all.
    pub const fn view_permission(&self) -> PermissionName {
        match self {
            ResourceKind::Suppliers => PermissionName::ViewSuppliers,
            ResourceKind::Receivers => PermissionName::ViewReceivers,
            ResourceKind::Products => PermissionName::ViewProducts,
            ResourceKind::Inventories => PermissionName::ViewInventories,
            ResourceKind::InboundOrders => PermissionName::ViewInboundOrders,
            ResourceKind::OutboundOrders => PermissionName::ViewOutboundOrders,
            ResourceKind::Users => PermissionName::ViewUsers,
        }
    }

    /// Permission needed for the "create" button.
    pub const fn create_permission(&self) -> PermissionName {
        match self {
            ResourceKind::Suppliers => PermissionName::CreateSupplier,
            ResourceKind::Receivers => PermissionName::CreateReceiver,
            ResourceKind::Products => PermissionName::CreateProduct,
            ResourceKind::Inventories => PermissionName::CreateInventory,
            ResourceKind::InboundOrders => PermissionName::CreateInboundOrder,
            ResourceKind::OutboundOrders => PermissionName::CreateOutboundOrder,
            ResourceKind::Users => PermissionName::CreateUser,
        }
    }

    /// Permission needed for the "edit" button.
    pub const fn update_permission(&self) -> PermissionName {
        match self {
            ResourceKind::Suppliers => PermissionName::UpdateSupplier,
            ResourceKind::Receivers => PermissionName::UpdateReceiver,
            ResourceKind::Products => PermissionName::UpdateProduct,
            ResourceKind::Inventories => PermissionName::UpdateInventory,
            ResourceKind::InboundOrders => PermissionName::UpdateInboundOrder,
            ResourceKind::OutboundOrders => PermissionName::UpdateOutboundOrder,
            ResourceKind::Users => PermissionName::UpdateUser,
        }
    }

    /// Permission needed for the "delete" button.
    pub const fn delete_permission(&self) -> PermissionName {
        match self {
            ResourceKind::Suppliers => PermissionName::DeleteSupplier,
            ResourceKind::Receivers => PermissionName::DeleteReceiver,
            ResourceKind::Products => PermissionName::DeleteProduct,
            ResourceKind::Inventories => PermissionName::DeleteInventory,
            ResourceKind::InboundOrders => PermissionName::DeleteInboundOrder,
            ResourceKind::OutboundOrders => PermissionName::DeleteOutboundOrder,
            ResourceKind::Users => PermissionName::DeleteUser,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Accepts the REST path, the envelope key, or a bare singular.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| {
                needle == kind.path()
                    || needle == kind.collection_key().to_lowercase()
                    || needle == kind.label().to_lowercase().replace(' ', "-")
            })
            .ok_or_else(|| format!("Unknown resource: {}", s))
    }
}

/// An entity type that lives in a paginated collection.
pub trait Resource: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Which collection this entity belongs to.
    const KIND: ResourceKind;

    /// Server-assigned identity.
    fn id(&self) -> &str;
}

macro_rules! impl_resource {
    ($ty:ty, $kind:expr) => {
        impl Resource for $ty {
            const KIND: ResourceKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

// =============================================================================
// Audit
// =============================================================================

/// Who touched an entity and when.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(default)]
    pub created_by: Option<String>,

    #[serde(default)]
    pub updated_by: Option<String>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Directory Entities
// =============================================================================

/// A business the stock is bought from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// A business the stock is shipped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receiver {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

// =============================================================================
// Catalog Entities
// =============================================================================

/// A catalog item.
///
/// Prices are integer cents; the dashboard never does float money math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// Stock on hand for one product at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reorder_level: Option<i64>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Inventory {
    /// True when stock has fallen to or below the reorder level.
    pub fn needs_reorder(&self) -> bool {
        self.reorder_level
            .map(|level| self.quantity <= level)
            .unwrap_or(false)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Lifecycle of an inbound or outbound order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Approved,
    Shipped,
    Received,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Received => "received",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Stock arriving from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InboundOrder {
    pub id: String,
    pub supplier_id: String,
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub expected_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// Stock leaving for a receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OutboundOrder {
    pub id: String,
    pub receiver_id: String,
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub dispatch_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

// =============================================================================
// Users
// =============================================================================

/// A dashboard account belonging to the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl_resource!(Supplier, ResourceKind::Suppliers);
impl_resource!(Receiver, ResourceKind::Receivers);
impl_resource!(Product, ResourceKind::Products);
impl_resource!(Inventory, ResourceKind::Inventories);
impl_resource!(InboundOrder, ResourceKind::InboundOrders);
impl_resource!(OutboundOrder, ResourceKind::OutboundOrders);
impl_resource!(User, ResourceKind::Users);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!("suppliers".parse::<ResourceKind>().unwrap(), ResourceKind::Suppliers);
        assert_eq!(
            "inbound-orders".parse::<ResourceKind>().unwrap(),
            ResourceKind::InboundOrders
        );
        assert_eq!(
            "outboundOrders".parse::<ResourceKind>().unwrap(),
            ResourceKind::OutboundOrders
        );
        assert_eq!("product".parse::<ResourceKind>().unwrap(), ResourceKind::Products);
        assert!("widgets".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_supplier_wire_shape() {
        let json = r#"{
            "id": "s-1",
            "name": "Acme",
            "email": "sales@acme.test",
            "contactPerson": "Wile",
            "createdBy": "admin@acme.test",
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;
        let supplier: Supplier = serde_json::from_str(json).unwrap();
        assert_eq!(supplier.id(), "s-1");
        assert_eq!(supplier.contact_person.as_deref(), Some("Wile"));
        assert_eq!(supplier.audit.created_by.as_deref(), Some("admin@acme.test"));
        assert!(supplier.audit.created_at.is_some());
        assert!(supplier.phone.is_none());
    }

    #[test]
    fn test_order_status_defaults_to_pending() {
        let json = r#"{"id":"o-1","supplierId":"s-1","productId":"p-1","quantity":4}"#;
        let order: InboundOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(InboundOrder::KIND, ResourceKind::InboundOrders);
    }

    #[test]
    fn test_inventory_reorder() {
        let mut inv = Inventory {
            id: "i-1".into(),
            product_id: "p-1".into(),
            product_name: None,
            quantity: 3,
            location: None,
            reorder_level: Some(5),
            audit: Audit::default(),
        };
        assert!(inv.needs_reorder());
        inv.quantity = 6;
        assert!(!inv.needs_reorder());
        inv.reorder_level = None;
        assert!(!inv.needs_reorder());
    }
}
