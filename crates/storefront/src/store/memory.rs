//! In-memory document store.
//!
//! Backs tests and local development. Subscriptions are notified
//! synchronously on every write to the subscribed collection, which gives
//! the same at-least-once snapshot semantics the hosted platform provides.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Document, DocumentStore, Query, Snapshot, StoreError, Subscription};

struct Subscriber {
    id: u64,
    collection: String,
    query: Query,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
}

/// An in-memory [`DocumentStore`].
///
/// Cheaply cloneable; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn run_query(inner: &Inner, collection: &str, query: &Query) -> Vec<Document> {
        let mut docs: Vec<Document> = inner
            .collections
            .get(collection)
            .map(|coll| {
                coll.iter()
                    .filter(|(_, data)| query.matches(data))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut docs);
        docs
    }

    /// Push fresh snapshots to every subscriber of `collection`.
    ///
    /// Subscribers whose receiving end is gone are pruned here.
    fn notify(inner: &mut Inner, collection: &str) {
        let snapshots: Vec<(u64, Snapshot)> = inner
            .subscribers
            .iter()
            .filter(|s| s.collection == collection)
            .map(|s| (s.id, Self::run_query(inner, collection, &s.query)))
            .collect();

        let mut dead = Vec::new();
        for (id, snapshot) in snapshots {
            let Some(sub) = inner.subscribers.iter().find(|s| s.id == id) else {
                continue;
            };
            if sub.tx.send(snapshot).is_err() {
                dead.push(id);
            }
        }
        inner.subscribers.retain(|s| !dead.contains(&s.id));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Mutex poisoning only happens if a holder panicked; recover the data.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.lock();
        inner
            .collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), data);
        Self::notify(&mut inner, collection);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), data);
        Self::notify(&mut inner, collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|coll| coll.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let existing = inner
            .collections
            .get_mut(collection)
            .and_then(|coll| coll.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })?;

        if let (Value::Object(target), Value::Object(fields)) = (existing, patch) {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        Self::notify(&mut inner, collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(coll) = inner.collections.get_mut(collection) {
            coll.remove(id);
        }
        Self::notify(&mut inner, collection);
        Ok(())
    }

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, StoreError> {
        let inner = self.lock();
        Ok(Self::run_query(&inner, collection, &query))
    }

    async fn subscribe(&self, collection: &str, query: Query) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber_id;
        {
            let mut inner = self.lock();
            subscriber_id = inner.next_subscriber_id;
            inner.next_subscriber_id += 1;

            // Initial snapshot before any change arrives.
            let snapshot = Self::run_query(&inner, collection, &query);
            let _ = tx.send(snapshot);

            inner.subscribers.push(Subscriber {
                id: subscriber_id,
                collection: collection.to_owned(),
                query,
                tx,
            });
        }

        let store = self.clone();
        Ok(Subscription::new(rx, move || {
            let mut inner = store.lock();
            inner.subscribers.retain(|s| s.id != subscriber_id);
        }))
    }
}
