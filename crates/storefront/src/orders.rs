//! Order history reads.

use std::sync::Arc;

use tracing::instrument;

use tangelo_core::{OrderId, UserId};

use crate::models::collections;
use crate::models::Order;
use crate::store::{DocumentStore, Query, StoreError, Subscription};

/// Read access to placed orders.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn DocumentStore>,
}

impl OrderService {
    /// Create the service over a document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every order placed by the user, in store order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or a document is malformed.
    #[instrument(skip(self))]
    pub async fn orders_for_user(&self, uid: &UserId) -> Result<Vec<Order>, StoreError> {
        let docs = self
            .store
            .query(
                collections::ORDERS,
                Query::new().where_eq("userId", uid.as_str()),
            )
            .await?;
        docs.iter()
            .map(|doc| Order::from_doc(doc).map_err(StoreError::from))
            .collect()
    }

    /// Fetch one order by id. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or the document is
    /// malformed.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let Some(doc) = self.store.get(collections::ORDERS, id.as_str()).await? else {
            return Ok(None);
        };
        Ok(Some(Order::from_doc(&doc)?))
    }

    /// Subscribe to the user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    #[instrument(skip(self))]
    pub async fn watch_orders(&self, uid: &UserId) -> Result<Subscription, StoreError> {
        self.store
            .subscribe(
                collections::ORDERS,
                Query::new()
                    .where_eq("userId", uid.as_str())
                    .order_by_desc("createdAt"),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::store::MemoryDocumentStore;

    fn order_doc(user: &str, created_at: &str) -> serde_json::Value {
        json!({
            "userId": user,
            "items": [],
            "total": "0",
            "status": "placed",
            "createdAt": created_at,
        })
    }

    #[tokio::test]
    async fn test_orders_for_user_filters_by_user() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .create(collections::ORDERS, order_doc("u1", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();
        store
            .create(collections::ORDERS, order_doc("u2", "2024-01-02T00:00:00Z"))
            .await
            .unwrap();

        let service = OrderService::new(store);
        let orders = service.orders_for_user(&UserId::new("u1")).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].user_id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_get_order_missing_is_none() {
        let service = OrderService::new(Arc::new(MemoryDocumentStore::new()));
        assert!(service
            .get_order(&OrderId::new("ghost"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_watch_orders_delivers_newest_first() {
        let store = Arc::new(MemoryDocumentStore::new());
        let service = OrderService::new(store.clone());

        let mut sub = service.watch_orders(&UserId::new("u1")).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        store
            .create(collections::ORDERS, order_doc("u1", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();
        let _ = sub.next().await.unwrap();

        store
            .create(collections::ORDERS, order_doc("u1", "2024-02-01T00:00:00Z"))
            .await
            .unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].data["createdAt"], "2024-02-01T00:00:00Z");
    }
}
