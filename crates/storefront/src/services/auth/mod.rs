//! Accounts: hosted identity service plus user profile documents.
//!
//! Authentication is delegated to a hosted identity service (email/password
//! accounts, password-reset emails). [`IdentityProvider`] captures that
//! contract; [`HttpIdentityProvider`] talks to the real service and
//! [`MemoryIdentityProvider`] backs tests.
//!
//! [`AccountService`] composes the identity provider with the document
//! store: each auth identity has a companion profile document in `users`
//! keyed by the identity's uid.

mod error;
mod http;
mod memory;

pub use error::AuthError;
pub use http::HttpIdentityProvider;
pub use memory::MemoryIdentityProvider;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use tangelo_core::{Email, UserId};

use crate::models::collections;
use crate::models::{CurrentUser, ProfilePatch, UserProfile};
use crate::store::DocumentStore;

/// Fallback avatar when an upload carries no image.
const DEFAULT_AVATAR_BASE: &str = "https://api.dicebear.com/7.x/identicon/svg";

/// How long the storage backend takes to ingest an avatar before the URL is
/// readable. The hosted platform offers no completion callback over this
/// surface, so the service waits it out.
const AVATAR_UPLOAD_DELAY_MS: u64 = 1200;

/// An authenticated identity as reported by the identity service.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: UserId,
    pub email: Email,
    /// Short-lived token issued at sign-in; absent for fakes.
    pub id_token: Option<String>,
}

/// The hosted identity service contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account; returns the new identity.
    async fn create_account(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// Verify an email/password pair; returns the identity on success.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// Invalidate server-side session state for the identity, if any.
    async fn sign_out(&self, uid: &UserId) -> Result<(), AuthError>;

    /// Ask the service to email a password-reset link.
    async fn send_password_reset(&self, email: &Email) -> Result<(), AuthError>;
}

/// Registration, sign-in, and profile management.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
}

impl AccountService {
    /// Create the service over an identity provider and a document store.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { identity, store }
    }

    /// Register a new account: create the auth identity, then write its
    /// profile document.
    ///
    /// The two writes are not atomic. If the profile write fails the auth
    /// identity is left behind and a later sign-in finds no profile document.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailInUse`] when the email is already
    /// registered, or a store error if the profile write fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(&self, email: &Email, password: &str) -> Result<CurrentUser, AuthError> {
        let identity = self.identity.create_account(email, password).await?;

        self.store
            .set(
                collections::USERS,
                identity.uid.as_str(),
                json!({
                    "email": identity.email.as_str(),
                    "createdAt": Utc::now(),
                }),
            )
            .await?;

        info!(uid = %identity.uid, "registered new account");
        Ok(CurrentUser {
            uid: identity.uid,
            email: identity.email,
        })
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on a wrong email/password
    /// pair.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<CurrentUser, AuthError> {
        let identity = self.identity.sign_in(email, password).await?;
        info!(uid = %identity.uid, "signed in");
        Ok(CurrentUser {
            uid: identity.uid,
            email: identity.email,
        })
    }

    /// Sign out the identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity service rejects the request.
    #[instrument(skip(self))]
    pub async fn logout(&self, uid: &UserId) -> Result<(), AuthError> {
        self.identity.sign_out(uid).await
    }

    /// Request a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] if no account exists for the
    /// email.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn send_password_reset(&self, email: &Email) -> Result<(), AuthError> {
        self.identity.send_password_reset(email).await
    }

    /// Fetch the profile document for a user. `Ok(None)` if it was never
    /// written (registration half-failed) or was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    #[instrument(skip(self))]
    pub async fn profile(&self, uid: &UserId) -> Result<Option<UserProfile>, AuthError> {
        let Some(doc) = self.store.get(collections::USERS, uid.as_str()).await? else {
            warn!(uid = %uid, "no profile document for signed-in user");
            return Ok(None);
        };
        let profile = UserProfile::from_doc(&doc).map_err(crate::store::StoreError::from)?;
        Ok(Some(profile))
    }

    /// Merge the given fields into the user's profile document.
    ///
    /// # Errors
    ///
    /// Returns a store error if the profile document does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, uid: &UserId, patch: ProfilePatch) -> Result<(), AuthError> {
        let fields = serde_json::to_value(&patch).map_err(crate::store::StoreError::from)?;
        self.store
            .update(collections::USERS, uid.as_str(), fields)
            .await?;
        Ok(())
    }

    /// Upload a new avatar and store its URL on the profile.
    ///
    /// When `image_url` is `None` a deterministic identicon seeded by the
    /// uid is stored instead.
    ///
    /// # Errors
    ///
    /// Returns a store error if the profile write fails.
    #[instrument(skip(self, image_url))]
    pub async fn upload_avatar(
        &self,
        uid: &UserId,
        image_url: Option<String>,
    ) -> Result<String, AuthError> {
        tokio::time::sleep(std::time::Duration::from_millis(AVATAR_UPLOAD_DELAY_MS)).await;

        let url = image_url
            .unwrap_or_else(|| format!("{DEFAULT_AVATAR_BASE}?seed={}", uid.as_str()));

        self.store
            .update(
                collections::USERS,
                uid.as_str(),
                json!({ "avatarUrl": url }),
            )
            .await?;

        info!(uid = %uid, "avatar updated");
        Ok(url)
    }

    /// Delete the user's profile document.
    ///
    /// The auth identity itself is not deleted; the account can sign in
    /// again and will simply have no profile.
    ///
    /// # Errors
    ///
    /// Returns a store error if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete_profile(&self, uid: &UserId) -> Result<(), AuthError> {
        self.store.delete(collections::USERS, uid.as_str()).await?;
        Ok(())
    }
}
