//! Hosted document store client.
//!
//! The storefront owns no database: every remote entity lives in a hosted
//! document store exposing collection/document CRUD, equality/order queries,
//! and realtime subscriptions. [`DocumentStore`] captures that contract;
//! [`HttpDocumentStore`] talks to the real platform and
//! [`MemoryDocumentStore`] backs tests and local development.

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document does not exist.
    #[error("not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Rate limited by the platform.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The platform rejected the request.
    #[error("store rejected request: {0}")]
    Rejected(String),
}

/// A document: an opaque string id plus a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Create a document.
    #[must_use]
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// An equality filter on a document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Single-field ordering for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// A collection query: zero or more equality filters plus optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// An unfiltered query (the whole collection).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Order results by a field, ascending.
    #[must_use]
    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending: false,
        });
        self
    }

    /// Order results by a field, descending.
    #[must_use]
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending: true,
        });
        self
    }

    /// Whether a document payload satisfies every filter.
    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|f| data.get(&f.field) == Some(&f.value))
    }

    /// Sort documents in place according to `order_by`.
    pub fn sort(&self, docs: &mut [Document]) {
        let Some(order) = &self.order_by else { return };
        docs.sort_by(|a, b| {
            let av = a.data.get(&order.field);
            let bv = b.data.get(&order.field);
            let ord = compare_values(av, bv);
            if order.descending { ord.reverse() } else { ord }
        });
    }
}

/// Total order over JSON field values, for query ordering.
///
/// Missing fields sort first; timestamps stored as RFC 3339 strings compare
/// chronologically under the string branch.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}

/// One delivery of query results to a subscriber.
pub type Snapshot = Vec<Document>;

/// A cancellable realtime subscription.
///
/// Snapshots are delivered to a single consumer, at least once per matching
/// change (the first snapshot arrives immediately after subscribing).
/// Dropping the subscription also stops delivery; `cancel` makes it explicit.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Snapshot>,
    canceller: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    /// Build a subscription from a snapshot channel and a cancel action.
    #[must_use]
    pub fn new(
        rx: mpsc::UnboundedReceiver<Snapshot>,
        canceller: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            canceller: Box::new(canceller),
        }
    }

    /// Wait for the next snapshot. Returns `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Stop delivery and release producer-side resources.
    pub fn cancel(self) {
        (self.canceller)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// The hosted document store contract.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a server-assigned id; returns the id.
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Create or replace the document at `collection/id`.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Read a document. `Ok(None)` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge the top-level fields of `patch` into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Run a query against a collection.
    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, StoreError>;

    /// Subscribe to a query; every matching change produces a fresh snapshot.
    async fn subscribe(&self, collection: &str, query: Query) -> Result<Subscription, StoreError>;

    /// Fetch every document in a collection (unbounded read).
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.query(collection, Query::new()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_matches_equality() {
        let query = Query::new().where_eq("userId", "u1");
        assert!(query.matches(&json!({"userId": "u1", "total": "20"})));
        assert!(!query.matches(&json!({"userId": "u2"})));
        assert!(!query.matches(&json!({"total": "20"})));
    }

    #[test]
    fn test_query_matches_all_filters() {
        let query = Query::new()
            .where_eq("userId", "u1")
            .where_eq("status", "placed");
        assert!(query.matches(&json!({"userId": "u1", "status": "placed"})));
        assert!(!query.matches(&json!({"userId": "u1", "status": "shipped"})));
    }

    #[test]
    fn test_query_sort_descending_strings() {
        let query = Query::new().order_by_desc("createdAt");
        let mut docs = vec![
            Document::new("a", json!({"createdAt": "2024-01-01T00:00:00Z"})),
            Document::new("b", json!({"createdAt": "2024-03-01T00:00:00Z"})),
            Document::new("c", json!({"createdAt": "2024-02-01T00:00:00Z"})),
        ];
        query.sort(&mut docs);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_query_sort_numbers_ascending() {
        let query = Query::new().order_by_asc("stock");
        let mut docs = vec![
            Document::new("a", json!({"stock": 10})),
            Document::new("b", json!({"stock": 2})),
            Document::new("c", json!({})),
        ];
        query.sort(&mut docs);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        // Missing field sorts first.
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
