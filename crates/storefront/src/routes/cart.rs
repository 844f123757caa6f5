//! Cart and checkout route handlers.
//!
//! The cart itself is local to this instance; only checkout touches the
//! document store.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tangelo_core::{OrderId, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::CartLine;
use crate::state::AppState;

/// Cart contents plus the computed total.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
}

impl CartView {
    fn from_state(state: &AppState) -> Self {
        Self {
            lines: state.cart().lines(),
            total: state.cart().total(),
        }
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove line request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub product_id: ProductId,
}

/// Checkout response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub redirect: &'static str,
}

/// `GET /cart`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Json<CartView> {
    Json(CartView::from_state(&state))
}

/// `POST /cart/add`
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Json(body): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let product = state
        .catalog()
        .get_product(&body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", body.product_id)))?;

    state.cart().add(&product, body.quantity.unwrap_or(1))?;
    Ok(Json(CartView::from_state(&state)))
}

/// `POST /cart/update`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    state
        .cart()
        .set_quantity(&body.product_id, body.quantity)
        .map_err(|err| match err {
            crate::cart::CartError::NoSuchLine(id) => {
                AppError::NotFound(format!("cart line for product {id}"))
            }
            other => other.into(),
        })?;
    Ok(Json(CartView::from_state(&state)))
}

/// `POST /cart/remove`
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Json(body): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    state.cart().remove(&body.product_id)?;
    Ok(Json(CartView::from_state(&state)))
}

/// `POST /checkout`
#[instrument(skip(state, user), fields(uid = %user.uid))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutResponse>> {
    let order_id = state.checkout().checkout(&user).await?;
    Ok(Json(CheckoutResponse {
        order_id,
        redirect: "/account/orders",
    }))
}
