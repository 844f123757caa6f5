//! Account route handlers (all require a signed-in user).

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tangelo_core::OrderId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, ProfilePatch, UserProfile};
use crate::state::AppState;

/// Avatar upload request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRequest {
    /// URL of the uploaded image; omitted to fall back to a generated one.
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// `GET /account`
#[instrument(skip(state, user), fields(uid = %user.uid))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>> {
    let profile = state
        .accounts()
        .profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_string()))?;
    Ok(Json(profile))
}

/// `POST /account/profile`
#[instrument(skip(state, user, patch), fields(uid = %user.uid))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserProfile>> {
    state.accounts().update_profile(&user.uid, patch).await?;
    let profile = state
        .accounts()
        .profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_string()))?;
    Ok(Json(profile))
}

/// `POST /account/avatar`
#[instrument(skip(state, user, body), fields(uid = %user.uid))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AvatarRequest>,
) -> Result<Json<AvatarResponse>> {
    let avatar_url = state
        .accounts()
        .upload_avatar(&user.uid, body.image_url)
        .await?;
    Ok(Json(AvatarResponse { avatar_url }))
}

/// `GET /account/orders`
#[instrument(skip(state, user), fields(uid = %user.uid))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().orders_for_user(&user.uid).await?))
}

/// `GET /account/orders/{id}`
///
/// Looks the order up by id alone; any signed-in user can fetch any order.
#[instrument(skip(state, _user))]
pub async fn order_detail(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .get_order(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    Ok(Json(order))
}
