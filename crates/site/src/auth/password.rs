//! Email/password identity provider backed by the site database.
//!
//! Sign-in issues an opaque token, stores it in `site.auth_session`, and keeps
//! a copy in the local key-value area so the session is restored after a
//! restart, the way a hosted provider restores a persisted browser session.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;
use tokio::sync::watch;
use uuid::Uuid;

use chapter_core::{AuthUser, Email, Uid};

use super::kv::KeyValueArea;
use super::{AuthError, IdentityProvider};

/// Key under which the session token is persisted locally.
const TOKEN_KEY: &str = "chapter_auth_token";

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Message returned for any credential mismatch.
const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Identity provider over `site.account` and `site.auth_session`.
pub struct PgIdentityProvider {
    pool: PgPool,
    tokens: Arc<dyn KeyValueArea>,
    session_ttl: Duration,
    current: watch::Sender<Option<AuthUser>>,
}

impl std::fmt::Debug for PgIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgIdentityProvider")
            .field("session_ttl", &self.session_ttl)
            .field("current", &*self.current.borrow())
            .finish_non_exhaustive()
    }
}

impl PgIdentityProvider {
    /// Create the provider and restore a persisted session, if still valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Database` if the session lookup fails.
    pub async fn restore(
        pool: PgPool,
        tokens: Arc<dyn KeyValueArea>,
        session_ttl: Duration,
    ) -> Result<Self, AuthError> {
        let provider = Self {
            pool,
            tokens,
            session_ttl,
            current: watch::Sender::new(None),
        };

        if let Some(token) = provider.tokens.get(TOKEN_KEY) {
            match provider.user_for_token(&token).await? {
                Some(user) => {
                    tracing::debug!(uid = %user.uid, "Restored persisted session");
                    provider.current.send_replace(Some(user));
                }
                None => {
                    tracing::debug!("Persisted session expired or revoked");
                    provider.forget_token();
                }
            }
        }

        Ok(provider)
    }

    /// Register a new email/password account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword`,
    /// `AuthError::AccountExists`, or a database error.
    pub async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        let uid = Uid::new(Uuid::new_v4().simple().to_string());

        sqlx::query("INSERT INTO site.account (uid, email, password_hash) VALUES ($1, $2, $3)")
            .bind(&uid)
            .bind(&email)
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return AuthError::AccountExists;
                }
                AuthError::Database(e)
            })?;

        tracing::info!(%uid, %email, "Account created");
        Ok(AuthUser { uid, email })
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let row: Option<(Uid, Email, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT a.uid, a.email, s.expires_at
            FROM site.auth_session s
            JOIN site.account a ON a.uid = s.uid
            WHERE s.token = $1
            ",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .filter(|(_, _, expires_at)| *expires_at > Utc::now())
            .map(|(uid, email, _)| AuthUser { uid, email }))
    }

    fn forget_token(&self) {
        if let Err(e) = self.tokens.remove(TOKEN_KEY) {
            tracing::warn!(error = %e, "Failed to clear persisted session token");
        }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let rejected = || AuthError::Rejected(INVALID_CREDENTIALS.to_owned());
        let email = Email::parse(email).map_err(|_| rejected())?;

        let row: Option<(Uid, String)> =
            sqlx::query_as("SELECT uid, password_hash FROM site.account WHERE email = $1")
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;
        let (uid, password_hash) = row.ok_or_else(rejected)?;
        verify_password(password, &password_hash).map_err(|()| rejected())?;

        let token = new_token();
        let expires_at = Utc::now() + self.session_ttl;
        sqlx::query("INSERT INTO site.auth_session (token, uid, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(&uid)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        if let Err(e) = self.tokens.set(TOKEN_KEY, &token) {
            tracing::warn!(error = %e, "Session token not persisted; sign-in lasts this process only");
        }

        let user = AuthUser { uid, email };
        tracing::info!(uid = %user.uid, "Signed in");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.tokens.get(TOKEN_KEY);
        self.forget_token();
        self.current.send_replace(None);

        if let Some(token) = token {
            sqlx::query("DELETE FROM site.auth_session WHERE token = $1")
                .bind(&token)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }
}

/// 256-bit random session token.
fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), ()> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| ())?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(verify_password("wrong horse battery", &hash).is_err());
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = new_token();
        let b = new_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
