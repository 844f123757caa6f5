//! HTTP client for the hosted document store.
//!
//! The platform exposes a project-scoped REST surface:
//!
//! - `POST   {base}/{collection}` creates a document, returns `{"id": ...}`
//! - `PUT    {base}/{collection}/{id}` creates or replaces a document
//! - `GET    {base}/{collection}/{id}` returns `{"id": ..., "data": ...}`
//! - `PATCH  {base}/{collection}/{id}` merges top-level fields
//! - `DELETE {base}/{collection}/{id}` deletes (missing is not an error)
//! - `POST   {base}/{collection}:query` runs filters/ordering server-side
//!
//! The platform pushes no change feed over plain HTTP, so [`subscribe`] is
//! implemented by polling the query on a fixed interval and emitting a
//! snapshot whenever the result set changes.
//!
//! [`subscribe`]: DocumentStore::subscribe

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::config::PlatformConfig;

use super::{Document, DocumentStore, Query, StoreError, Subscription};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Client for the hosted document store.
///
/// Cheaply cloneable; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpDocumentStore {
    inner: Arc<HttpDocumentStoreInner>,
}

struct HttpDocumentStoreInner {
    client: reqwest::Client,
    base: String,
    api_key: SecretString,
    poll_interval: Duration,
}

/// Wire shape of a stored document.
#[derive(Debug, Deserialize)]
struct DocumentBody {
    id: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: String,
}

/// Wire shape of a `:query` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<FilterBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_by: Option<OrderByBody>,
}

#[derive(Debug, Serialize)]
struct FilterBody {
    field: String,
    op: &'static str,
    value: Value,
}

#[derive(Debug, Serialize)]
struct OrderByBody {
    field: String,
    direction: &'static str,
}

impl From<&Query> for QueryBody {
    fn from(query: &Query) -> Self {
        Self {
            filters: query
                .filters
                .iter()
                .map(|f| FilterBody {
                    field: f.field.clone(),
                    op: "==",
                    value: f.value.clone(),
                })
                .collect(),
            order_by: query.order_by.as_ref().map(|o| OrderByBody {
                field: o.field.clone(),
                direction: if o.descending { "desc" } else { "asc" },
            }),
        }
    }
}

impl HttpDocumentStore {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(config: &PlatformConfig) -> Self {
        let base = format!(
            "{}/projects/{}",
            config.api_base_url.as_str().trim_end_matches('/'),
            config.project_id
        );

        Self {
            inner: Arc::new(HttpDocumentStoreInner {
                client: reqwest::Client::new(),
                base,
                api_key: config.api_key.clone(),
                poll_interval: Duration::from_secs(config.poll_interval_secs),
            }),
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.inner.base)
    }

    /// Send a request with the project API key attached and map the response
    /// status onto [`StoreError`].
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request
            .header(API_KEY_HEADER, self.inner.api_key.expose_secret())
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(StoreError::RateLimited(retry_after));
        }

        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "document store returned non-success status"
            );
            return Err(StoreError::Rejected(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self, data))]
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let url = format!("{}/{collection}", self.inner.base);
        let response = self.execute(self.inner.client.post(&url).json(&data)).await?;
        let created: CreatedBody = response.json().await?;
        debug!(collection, id = %created.id, "created document");
        Ok(created.id)
    }

    #[instrument(skip(self, data))]
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        self.execute(self.inner.client.put(&url).json(&data)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.document_url(collection, id);
        let response = self.execute(self.inner.client.get(&url)).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: DocumentBody = response.json().await?;
        Ok(Some(Document::new(body.id, body.data)))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        let response = self.execute(self.inner.client.patch(&url).json(&patch)).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        self.execute(self.inner.client.delete(&url)).await?;
        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/{collection}:query", self.inner.base);
        let response = self
            .execute(self.inner.client.post(&url).json(&QueryBody::from(&query)))
            .await?;
        let bodies: Vec<DocumentBody> = response.json().await?;
        Ok(bodies
            .into_iter()
            .map(|b| Document::new(b.id, b.data))
            .collect())
    }

    #[instrument(skip(self, query))]
    async fn subscribe(&self, collection: &str, query: Query) -> Result<Subscription, StoreError> {
        // First snapshot is delivered before the subscription is handed back,
        // so consumers never wait a full poll interval for initial data.
        let initial = self.query(collection, query.clone()).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(initial.clone());

        let store = self.clone();
        let collection = collection.to_owned();
        let poll_interval = self.inner.poll_interval;

        let handle = tokio::spawn(async move {
            let mut last = initial;
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it, the initial snapshot
            // already went out.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match store.query(&collection, query.clone()).await {
                    Ok(snapshot) => {
                        if snapshot != last {
                            last = snapshot.clone();
                            if tx.send(snapshot).is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        debug!(collection, error = %err, "subscription poll failed, will retry");
                    }
                }
            }
        });

        Ok(Subscription::new(rx, move || handle.abort()))
    }
}
