//! Account service error types.

use thiserror::Error;

use tangelo_core::EmailError;

use crate::store::StoreError;

/// Errors from registration, sign-in, and profile operations.
///
/// Provider error codes such as `EMAIL_EXISTS` are carried through verbatim
/// in [`AuthError::EmailInUse`] so callers see exactly what the identity
/// service reported.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email failed local validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong email/password combination.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// No account exists for this email.
    #[error("no account found for this email")]
    UserNotFound,

    /// The email is already registered. Holds the provider's error code.
    #[error("{0}")]
    EmailInUse(String),

    /// The password was rejected as too weak. Holds the provider's message.
    #[error("{0}")]
    WeakPassword(String),

    /// HTTP request to the identity service failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity service returned an unrecognized error.
    #[error("identity service error: {0}")]
    Service(String),

    /// Document store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_in_use_displays_provider_code_verbatim() {
        let err = AuthError::EmailInUse("EMAIL_EXISTS".to_owned());
        assert_eq!(err.to_string(), "EMAIL_EXISTS");
    }

    #[test]
    fn test_invalid_credentials_display() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "invalid email or password"
        );
    }
}
