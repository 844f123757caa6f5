//! Integration test harness for Tangelo.
//!
//! Spins up the full storefront router in-process on an ephemeral port,
//! backed by in-memory fakes for the document store, identity service, and
//! cart persistence. Tests drive it over real HTTP with a cookie-holding
//! `reqwest` client, so sessions behave as they would in production.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, routing::get};
use secrecy::SecretString;

use tangelo_storefront::cart::MemoryCartStore;
use tangelo_storefront::config::{PlatformConfig, StorefrontConfig};
use tangelo_storefront::services::auth::MemoryIdentityProvider;
use tangelo_storefront::state::AppState;
use tangelo_storefront::store::MemoryDocumentStore;
use tangelo_storefront::{middleware, routes};

/// A running storefront instance plus handles to its in-memory backends.
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryDocumentStore>,
    pub identity: Arc<MemoryIdentityProvider>,
    pub state: AppState,
}

impl TestApp {
    /// Client with a cookie store, so the session survives across requests.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().expect("valid host"),
        port: 0,
        base_url: "http://127.0.0.1:0".parse().expect("valid url"),
        cart_path: PathBuf::from("/dev/null"),
        platform: PlatformConfig {
            project_id: "tangelo-test".to_owned(),
            api_base_url: "http://127.0.0.1:1/v1".parse().expect("valid url"),
            auth_base_url: "http://127.0.0.1:1/v1".parse().expect("valid url"),
            api_key: SecretString::from("kQ9#vL2@xT7!bN4$wR8&mJ0*"),
            poll_interval_secs: 1,
        },
    }
}

/// Start a storefront on an ephemeral port with in-memory backends.
///
/// # Panics
///
/// Panics if the server cannot be started.
pub async fn spawn_app() -> TestApp {
    let config = test_config();

    let store = Arc::new(MemoryDocumentStore::new());
    let identity = Arc::new(MemoryIdentityProvider::new());
    let cart_store = Arc::new(MemoryCartStore::new());

    let state = AppState::new(config, store.clone(), identity.clone(), cart_store)
        .expect("Failed to initialize state");

    let session_layer = middleware::create_session_layer(state.config());

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server error");
    });

    TestApp {
        base_url: format!("http://{addr}"),
        store,
        identity,
        state,
    }
}
