//! Tangelo Storefront - Public e-commerce site.
//!
//! This binary serves the storefront JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Hosted document store for products, orders, and user profiles
//! - Hosted identity service for email/password accounts
//! - Local JSON file for the cart (device-local, like the browser build)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tangelo_storefront::cart::JsonFileCartStore;
use tangelo_storefront::config::StorefrontConfig;
use tangelo_storefront::services::auth::HttpIdentityProvider;
use tangelo_storefront::state::AppState;
use tangelo_storefront::store::HttpDocumentStore;
use tangelo_storefront::{middleware, routes};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tangelo_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Hosted platform clients
    let store = Arc::new(HttpDocumentStore::new(&config.platform));
    let identity = Arc::new(HttpIdentityProvider::new(&config.platform));
    let cart_store = Arc::new(JsonFileCartStore::new(config.cart_path.clone()));

    // Build application state
    let state = AppState::new(config.clone(), store, identity, cart_store)
        .expect("Failed to initialize application state");

    // Optionally seed an empty catalog (no-op if products exist)
    if std::env::var("TANGELO_SEED_CATALOG").is_ok_and(|v| v == "1") {
        state
            .catalog()
            .seed_default_products()
            .await
            .expect("Failed to seed catalog");
    }

    // Create session layer
    let session_layer = middleware::create_session_layer(state.config());

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
