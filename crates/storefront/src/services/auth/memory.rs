//! In-memory identity provider for tests and local development.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use tangelo_core::{Email, UserId};

use super::{AuthError, Identity, IdentityProvider};

struct Account {
    uid: UserId,
    password: String,
}

/// An in-memory [`IdentityProvider`].
///
/// Stores plain-text passwords; never use outside tests. Password-reset
/// requests are recorded so tests can assert they were issued.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    reset_requests: Mutex<Vec<String>>,
}

impl MemoryIdentityProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails that asked for a password reset, in request order.
    #[must_use]
    pub fn reset_requests(&self) -> Vec<String> {
        self.reset_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let mut accounts = self
            .accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if accounts.contains_key(email.as_str()) {
            // Same code the hosted service reports for a duplicate.
            return Err(AuthError::EmailInUse("EMAIL_EXISTS".to_owned()));
        }

        let uid = UserId::new(Uuid::new_v4().to_string());
        accounts.insert(
            email.as_str().to_owned(),
            Account {
                uid: uid.clone(),
                password: password.to_owned(),
            },
        );

        Ok(Identity {
            uid,
            email: email.clone(),
            id_token: None,
        })
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let accounts = self
            .accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let account = accounts
            .get(email.as_str())
            .ok_or(AuthError::InvalidCredentials)?;
        if account.password != password {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Identity {
            uid: account.uid.clone(),
            email: email.clone(),
            id_token: None,
        })
    }

    async fn sign_out(&self, _uid: &UserId) -> Result<(), AuthError> {
        Ok(())
    }

    async fn send_password_reset(&self, email: &Email) -> Result<(), AuthError> {
        let accounts = self
            .accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !accounts.contains_key(email.as_str()) {
            return Err(AuthError::UserNotFound);
        }
        drop(accounts);

        self.reset_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(email.as_str().to_owned());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_account_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_account(&email("a@b.c"), "pw")
            .await
            .unwrap();
        let err = provider
            .create_account(&email("a@b.c"), "pw2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailInUse(_)));
    }

    #[tokio::test]
    async fn test_sign_in_unknown_email_is_invalid_credentials() {
        let provider = MemoryIdentityProvider::new();
        let err = provider.sign_in(&email("a@b.c"), "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_reset_requests_are_recorded() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_account(&email("a@b.c"), "pw")
            .await
            .unwrap();
        provider.send_password_reset(&email("a@b.c")).await.unwrap();
        assert_eq!(provider.reset_requests(), vec!["a@b.c".to_owned()]);
    }
}
