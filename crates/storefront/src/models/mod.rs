//! Domain models for storefront.
//!
//! All remote entities live in the hosted document store; the structs here
//! serialize to exactly the field layout the store holds (camelCase keys,
//! document id kept outside the payload). [`CartLine`] is the one local
//! entity: it is persisted on this device only and never leaves it except
//! as a denormalized copy inside an order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tangelo_core::{Email, OrderId, OrderStatus, ProductId, UserId};

use crate::store::Document;

/// Session storage keys.
pub mod session_keys {
    /// Key for the signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}

/// Document store collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
}

/// A catalog product.
///
/// Owned by the catalog; mutated by admin edits and by the stock decrement
/// during checkout. Stock is intended to stay non-negative, but nothing in
/// the store enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Document id. Attached from the document on read, never stored in
    /// the payload itself.
    #[serde(skip_deserializing)]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Build a product from a store document, attaching the document id.
    ///
    /// # Errors
    ///
    /// Returns an error if the document payload does not match the product
    /// layout.
    pub fn from_doc(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut product: Self = serde_json::from_value(doc.data.clone())?;
        product.id = ProductId::new(&doc.id);
        Ok(product)
    }
}

/// Fields for a new product (admin add).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Partial product update (admin edit). Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A line in the local cart.
///
/// `price` and `stock` are snapshots taken when the line was created, not
/// necessarily current. Serialized exactly as the persisted cart file holds
/// it (an array of these objects, no schema version).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product id the line refers to.
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    /// Stock observed when the line was added or last refreshed.
    pub stock: u32,
}

impl CartLine {
    /// Line subtotal: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A denormalized order line: name and price are copied at order time, so
/// later product edits do not rewrite order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.id.clone(),
            name: line.name.clone(),
            price: line.price,
            quantity: line.quantity,
        }
    }
}

/// A placed order. Created once at checkout; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Document id. Attached from the document on read, never stored in
    /// the payload itself.
    #[serde(skip_deserializing)]
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build an order from a store document, attaching the document id.
    ///
    /// # Errors
    ///
    /// Returns an error if the document payload does not match the order
    /// layout.
    pub fn from_doc(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut order: Self = serde_json::from_value(doc.data.clone())?;
        order.id = OrderId::new(&doc.id);
        Ok(order)
    }
}

/// A user profile document, keyed by the auth identity's uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Document id, equal to the auth uid. Attached from the document on
    /// read, never stored in the payload itself.
    #[serde(skip_deserializing)]
    pub id: UserId,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Set at registration; older documents may lack it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Build a profile from a store document, attaching the document id.
    ///
    /// # Errors
    ///
    /// Returns an error if the document payload does not match the profile
    /// layout.
    pub fn from_doc(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut profile: Self = serde_json::from_value(doc.data.clone())?;
        profile.id = UserId::new(&doc.id);
        Ok(profile)
    }
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// The signed-in user, held in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserId,
    pub email: Email,
}
