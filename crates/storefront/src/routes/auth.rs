//! Auth route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use tangelo_core::{Email, UserId};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Registration / login request body.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Password reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub uid: UserId,
    pub email: Email,
    pub redirect: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub uid: UserId,
    pub email: Email,
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|err| AppError::Auth(AuthError::InvalidEmail(err)))
}

/// `POST /auth/register`
///
/// Creates the account but does not sign it in; the client is pointed at
/// the login form.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let email = parse_email(&body.email)?;
    let user = state.accounts().register(&email, &body.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            uid: user.uid,
            email: user.email,
            redirect: "/auth/login",
        }),
    ))
}

/// `POST /auth/login`
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>> {
    let email = parse_email(&body.email)?;
    let user = state.accounts().login(&email, &body.password).await?;

    set_current_user(&session, &user)
        .await
        .map_err(|err| AppError::Internal(err.to_string()))?;

    Ok(Json(LoginResponse {
        uid: user.uid,
        email: user.email,
    }))
}

/// `GET /auth/me`
///
/// The signed-in user, or `null` when nobody is signed in. Clients call
/// this on load to hydrate their session state.
#[instrument(skip(user))]
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<Option<CurrentUser>> {
    Json(user)
}

/// `POST /auth/logout`
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<StatusCode> {
    state.accounts().logout(&user.uid).await?;
    clear_current_user(&session)
        .await
        .map_err(|err| AppError::Internal(err.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /auth/reset`
#[instrument(skip(state, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<StatusCode> {
    let email = parse_email(&body.email)?;
    state.accounts().send_password_reset(&email).await?;
    Ok(StatusCode::ACCEPTED)
}
