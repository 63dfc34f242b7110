//! Authentication and admin authorization.
//!
//! - [`IdentityProvider`] - sign-in, sign-out and auth-state updates
//! - [`PgIdentityProvider`] - email/password accounts in the site database
//! - [`AdminDirectory`] - authoritative per-user admin records
//! - [`KeyValueArea`] - local persistent storage for hints and tokens
//! - [`SessionCache`] - the `{user, is_admin, is_loading_auth}` state machine

mod admins;
mod error;
mod kv;
mod password;
mod session;

pub use admins::AdminDirectory;
pub use error::{AdminLoginError, AuthError};
pub use kv::{FileKeyValue, KeyValueArea, KeyValueError, MemoryKeyValue};
pub use password::PgIdentityProvider;
pub use session::{
    ADMIN_HINT_KEY, AdminStatus, AuthPhase, AuthState, GuardDecision, Navigation,
    PendingAdminCheck, RouteGuard, SessionCache,
};

use async_trait::async_trait;
use tokio::sync::watch;

use chapter_core::AuthUser;

/// Hosted identity provider contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with email and password.
    ///
    /// On success the new user is also published to subscribers.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// End the current provider session and publish `None`.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Auth-state updates.
    ///
    /// The receiver observes the current user immediately; dropping it
    /// unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}
