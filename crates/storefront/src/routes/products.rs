//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tangelo_core::ProductId;

use crate::error::{AppError, Result};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: ProductId,
}

/// `GET /products`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Product>>> {
    let products = state
        .catalog()
        .list_products(params.category.as_deref())
        .await?;
    Ok(Json(products))
}

/// `GET /products/categories`
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.catalog().categories().await?))
}

/// `GET /products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .get_product(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(product))
}

/// `POST /products`
#[instrument(skip(state, product), fields(name = %product.name))]
pub async fn add(
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state.catalog().add_product(&product).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `POST /products/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<StatusCode> {
    match state.catalog().update_product(&id, patch).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(crate::store::StoreError::NotFound { .. }) => {
            Err(AppError::NotFound(format!("product {id}")))
        }
        Err(err) => Err(err.into()),
    }
}

/// `DELETE /products/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.catalog().delete_product(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
