//! HTTP client for the hosted identity service.
//!
//! The service speaks an identity-toolkit style REST surface keyed by the
//! project API key:
//!
//! - `POST {base}/accounts:signUp`
//! - `POST {base}/accounts:signInWithPassword`
//! - `POST {base}/accounts:signOut`
//! - `POST {base}/accounts:sendOobCode` (password reset)
//!
//! Failures arrive as `{"error": {"message": "CODE"}}`; known codes are
//! mapped onto [`AuthError`] variants and unknown ones surface as
//! [`AuthError::Service`].

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use tangelo_core::{Email, UserId};

use crate::config::PlatformConfig;

use super::{AuthError, Identity, IdentityProvider};

/// Client for the hosted identity service.
///
/// Cheaply cloneable; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    inner: Arc<HttpIdentityProviderInner>,
}

struct HttpIdentityProviderInner {
    client: reqwest::Client,
    base: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetBody<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignOutBody<'a> {
    local_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityBody {
    local_id: String,
    email: String,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpIdentityProvider {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            inner: Arc::new(HttpIdentityProviderInner {
                client: reqwest::Client::new(),
                base: config.auth_base_url.as_str().trim_end_matches('/').to_owned(),
                api_key: config.api_key.clone(),
            }),
        }
    }

    /// POST a body to an `accounts:` endpoint and decode the response,
    /// mapping service error codes onto [`AuthError`].
    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<R, AuthError> {
        let url = format!("{}/accounts:{action}", self.inner.base);
        let response = self
            .inner
            .client
            .post(&url)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        let status = response.status();
        let text = response.text().await?;
        let code = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        debug!(action, code = %code, "identity service rejected request");
        Err(map_error_code(code))
    }
}

/// Map a service error code onto an [`AuthError`].
///
/// `EMAIL_EXISTS` and weak-password messages keep the service's wording;
/// everything credential-shaped collapses into [`AuthError::InvalidCredentials`]
/// so responses do not reveal whether the email is registered.
fn map_error_code(code: String) -> AuthError {
    match code.as_str() {
        "EMAIL_EXISTS" => AuthError::EmailInUse(code),
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" => AuthError::InvalidCredentials,
        "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
        c if c.starts_with("WEAK_PASSWORD") => AuthError::WeakPassword(code),
        _ => AuthError::Service(code),
    }
}

impl TryFrom<IdentityBody> for Identity {
    type Error = AuthError;

    fn try_from(body: IdentityBody) -> Result<Self, Self::Error> {
        let email = Email::parse(&body.email)?;
        Ok(Self {
            uid: UserId::new(body.local_id),
            email,
            id_token: body.id_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn create_account(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let body: IdentityBody = self
            .post(
                "signUp",
                &CredentialsBody {
                    email: email.as_str(),
                    password,
                },
            )
            .await?;
        body.try_into()
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let body: IdentityBody = self
            .post(
                "signInWithPassword",
                &CredentialsBody {
                    email: email.as_str(),
                    password,
                },
            )
            .await?;
        body.try_into()
    }

    #[instrument(skip(self))]
    async fn sign_out(&self, uid: &UserId) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .post(
                "signOut",
                &SignOutBody {
                    local_id: uid.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn send_password_reset(&self, email: &Email) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .post(
                "sendOobCode",
                &ResetBody {
                    request_type: "PASSWORD_RESET",
                    email: email.as_str(),
                },
            )
            .await?;
        Ok(())
    }
}
