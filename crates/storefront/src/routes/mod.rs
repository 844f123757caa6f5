//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Health check
//!
//! # Products
//! GET    /products                - Product listing (?category= filter)
//! GET    /products/categories     - Distinct category list
//! GET    /products/{id}           - Product detail
//! POST   /products                - Add product (admin)
//! POST   /products/{id}           - Edit product (admin)
//! DELETE /products/{id}           - Delete product (admin)
//!
//! # Cart
//! GET    /cart                    - Cart contents and total
//! POST   /cart/add                - Add a product to the cart
//! POST   /cart/update             - Set a line's quantity
//! POST   /cart/remove             - Remove a line
//!
//! # Checkout
//! POST   /checkout                - Place an order (requires auth)
//!
//! # Auth
//! POST   /auth/register           - Create an account
//! POST   /auth/login              - Sign in
//! GET    /auth/me                 - Signed-in user, or null
//! POST   /auth/logout             - Sign out
//! POST   /auth/reset              - Request a password-reset email
//!
//! # Account (requires auth)
//! GET    /account                 - Profile
//! POST   /account/profile         - Edit profile fields
//! POST   /account/avatar          - Upload avatar
//! GET    /account/orders          - Order history
//! GET    /account/orders/{id}     - Order detail
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::add))
        .route("/categories", get(products::categories))
        .route(
            "/{id}",
            get(products::show)
                .post(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .route("/reset", post(auth::reset_password))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile))
        .route("/profile", post(account::update_profile))
        .route("/avatar", post(account::upload_avatar))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order_detail))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
}
