//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider rejected the credentials; carries the provider's message.
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached or refused the call.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] chapter_core::EmailError),

    /// Account already exists.
    #[error("an account with this email already exists")]
    AccountExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Errors from the admin login side channel.
#[derive(Debug, Error)]
pub enum AdminLoginError {
    /// Sign-in itself failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Signed in, but the authoritative check did not confirm admin access.
    /// The session has been signed out.
    #[error("access denied: not an admin")]
    NotAdmin,
}
