//! # REST Contracts
//!
//! Typed request and response bodies for every endpoint the dashboard calls.
//! Nothing here is `serde_json::Value`-typed except the compacted outbound
//! body, so a schema change shows up as a compile error instead of a blank
//! table cell.
//!
//! ## Auth Response Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /auth/login                                                       │
//! │                                                                         │
//! │  { firstName, lastName, email, role,          ──►  SessionUser         │
//! │    businessID, businessName, businessEmail,   ──►  Business            │
//! │    businessPhone, businessAddress: [a0, a1],  ──►  Business.address=a0 │
//! │    accessToken, refreshToken }                ──►  Session tokens      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::session::{Address, Business, Session, SessionUser};
use crate::types::{
    InboundOrder, Inventory, OrderStatus, OutboundOrder, Product, Receiver, Resource, Supplier,
    User,
};
use crate::validation::{
    compact_body, validate_email, validate_name, validate_password, validate_price_cents,
    validate_quantity, ValidationResult,
};

// =============================================================================
// Envelopes
// =============================================================================

/// The pagination envelope a list endpoint nests under its collection key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_count: usize,
    /// One-based.
    #[serde(default)]
    pub current_page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// Error body shapes the API is known to send.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// The server's human-readable text, if it sent any.
    pub fn text(self) -> Option<String> {
        self.error
            .or(self.message)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Auth
// =============================================================================

/// `POST /auth/login`. Also used to re-verify the password on unlock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        LoginRequest {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(crate::ValidationError::Required {
                field: "password".to_string(),
            });
        }
        Ok(())
    }
}

/// `POST /auth/register`: creates the business and its first user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub business_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub business_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub business_address: Option<Address>,
}

impl RegisterRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("first name", &self.first_name)?;
        validate_name("last name", &self.last_name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_name("business name", &self.business_name)?;
        if let Some(email) = self.business_email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// `POST /auth/logout`: invalidates the refresh token server-side.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Login / register response.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "businessID")]
    pub business_id: String,
    pub business_name: String,
    #[serde(default)]
    pub business_email: Option<String>,
    #[serde(default)]
    pub business_phone: Option<String>,
    /// Sent as a list, possibly `null`.
    #[serde(default)]
    #[ts(optional = nullable)]
    pub business_address: Option<Vec<Address>>,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    /// Builds the session. The first business address is the canonical one.
    pub fn into_session(self) -> Session {
        Session {
            user: SessionUser {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                role: self.role,
            },
            business: Business {
                id: self.business_id,
                name: self.business_name,
                email: self.business_email,
                phone: self.business_phone,
                address: self.business_address.into_iter().flatten().next(),
            },
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            is_locked: false,
        }
    }
}

// =============================================================================
// Roles
// =============================================================================

/// `POST /roles`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description: Option<String>,
}

impl CreateRoleRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("role name", &self.name)
    }
}

// =============================================================================
// Resource Drafts
// =============================================================================

/// A create/update body for one resource kind.
///
/// ## Outbound Body
/// Drafts are validated locally first; the JSON sent is the draft with every
/// null and blank-string field removed (see [`compact_body`]).
pub trait ResourceDraft: Serialize + Send + Sync {
    type Target: Resource;

    fn validate(&self) -> ValidationResult<()>;

    fn to_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self).map(compact_body)
    }
}

/// Create/update body for suppliers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplierDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

impl ResourceDraft for SupplierDraft {
    type Target = Supplier;

    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_optional_email(self.email.as_deref())
    }
}

/// Create/update body for receivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

impl ResourceDraft for ReceiverDraft {
    type Target = Receiver;

    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_optional_email(self.email.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price_cents: Option<i64>,
}

impl ResourceDraft for ProductDraft {
    type Target = Product;

    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        if let Some(cents) = self.price_cents {
            validate_price_cents(cents)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDraft {
    pub product_id: String,
    pub quantity: i64,
    pub location: Option<String>,
    pub reorder_level: Option<i64>,
}

impl ResourceDraft for InventoryDraft {
    type Target = Inventory;

    fn validate(&self) -> ValidationResult<()> {
        validate_name("product", &self.product_id)?;
        if self.quantity < 0 {
            return Err(crate::ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InboundOrderDraft {
    pub supplier_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub status: Option<OrderStatus>,
    pub expected_date: Option<String>,
    pub notes: Option<String>,
}

impl ResourceDraft for InboundOrderDraft {
    type Target = InboundOrder;

    fn validate(&self) -> ValidationResult<()> {
        validate_name("supplier", &self.supplier_id)?;
        validate_name("product", &self.product_id)?;
        validate_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OutboundOrderDraft {
    pub receiver_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub status: Option<OrderStatus>,
    pub dispatch_date: Option<String>,
    pub notes: Option<String>,
}

impl ResourceDraft for OutboundOrderDraft {
    type Target = OutboundOrder;

    fn validate(&self) -> ValidationResult<()> {
        validate_name("receiver", &self.receiver_id)?;
        validate_name("product", &self.product_id)?;
        validate_quantity(self.quantity)
    }
}

/// Create/update body for dashboard accounts.
///
/// `password` is only sent on create; leaving it `None` on update keeps
/// the current one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub password: Option<String>,
}

impl ResourceDraft for UserDraft {
    type Target = User;

    fn validate(&self) -> ValidationResult<()> {
        validate_name("first name", &self.first_name)?;
        validate_name("last name", &self.last_name)?;
        validate_email(&self.email)?;
        validate_name("role", &self.role)?;
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            validate_password(password)?;
        }
        Ok(())
    }
}

fn validate_optional_email(email: Option<&str>) -> ValidationResult<()> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => validate_email(email),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_json() -> &'static str {
        r#"{
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@acme.test",
            "role": "manager",
            "businessID": "b-1",
            "businessName": "Acme",
            "businessEmail": "hq@acme.test",
            "businessPhone": "555-0100",
            "businessAddress": [
                {"street": "1 Main St", "city": "Springfield"},
                {"street": "2 Side St", "city": "Shelbyville"}
            ],
            "accessToken": "access-1",
            "refreshToken": "refresh-1"
        }"#
    }

    #[test]
    fn test_auth_response_reads_first_address() {
        let resp: AuthResponse = serde_json::from_str(auth_json()).unwrap();
        let session = resp.into_session();
        assert_eq!(session.business.id, "b-1");
        assert_eq!(
            session.business.address.and_then(|a| a.street).as_deref(),
            Some("1 Main St")
        );
        assert_eq!(session.user.role, "manager");
        assert!(!session.is_locked);
    }

    #[test]
    fn test_auth_response_without_address() {
        let json = r#"{"firstName":"A","lastName":"B","email":"a@b.test","role":"staff",
            "businessID":"b","businessName":"B","accessToken":"x","refreshToken":"y"}"#;
        let session = serde_json::from_str::<AuthResponse>(json).unwrap().into_session();
        assert!(session.business.address.is_none());
    }

    #[test]
    fn test_auth_response_with_null_address() {
        let json = r#"{"firstName":"A","lastName":"B","email":"a@b.test","role":"staff",
            "businessID":"b","businessName":"B","businessAddress":null,
            "accessToken":"x","refreshToken":"y"}"#;
        let session = serde_json::from_str::<AuthResponse>(json).unwrap().into_session();
        assert!(session.business.address.is_none());
        assert_eq!(session.access_token, "x");
    }

    #[test]
    fn test_draft_body_drops_blank_fields() {
        let draft = SupplierDraft {
            name: "Acme".into(),
            email: Some("".into()),
            phone: None,
            address: Some("  ".into()),
            contact_person: Some("Wile".into()),
        };
        let body = draft.to_body().unwrap();
        let obj = body.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["name"], "Acme");
        assert_eq!(obj["contactPerson"], "Wile");
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = InboundOrderDraft {
            supplier_id: "s-1".into(),
            product_id: "p-1".into(),
            quantity: 0,
            ..Default::default()
        };
        assert!(draft.validate().is_err());
        draft.quantity = 3;
        assert!(draft.validate().is_ok());

        let bad_email = SupplierDraft {
            name: "Acme".into(),
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_error_body_text() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"Supplier not found"}"#).unwrap();
        assert_eq!(body.text().as_deref(), Some("Supplier not found"));
        let body: ErrorBody = serde_json::from_str(r#"{"message":"  "}"#).unwrap();
        assert_eq!(body.text(), None);
    }
}
