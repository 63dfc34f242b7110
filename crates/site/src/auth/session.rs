//! Session and admin-authorization cache.
//!
//! Tracks the signed-in user and whether they may use the admin surface.
//! Admin status resolves in two phases on every auth-state change:
//!
//! 1. [`SessionCache::begin`] applies the persisted hint synchronously: a
//!    user whose uid matches the stored admin hint is `Optimistic` right away.
//! 2. [`SessionCache::settle`] awaits the authoritative admin record and
//!    overwrites the status with `Confirmed` or `Denied`. A failed lookup is
//!    `Denied`.
//!
//! The authoritative value is applied last and unconditionally, so it always
//! wins over the hint for the same user.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use chapter_core::{AuthUser, Uid};

use super::admins::AdminDirectory;
use super::kv::KeyValueArea;
use super::{AdminLoginError, AuthError, IdentityProvider};

/// Key of the persisted admin hint (value: the verified admin's uid).
pub const ADMIN_HINT_KEY: &str = "chapter_admin_uid";

/// Admin status of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    /// No hint, authoritative check outstanding.
    Unknown,
    /// Hint matched; authoritative check outstanding.
    Optimistic,
    /// Authoritative record exists.
    Confirmed,
    /// No record, or the lookup failed.
    Denied,
}

impl AdminStatus {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Optimistic | Self::Confirmed)
    }

    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Confirmed | Self::Denied)
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated { user: AuthUser, admin: AdminStatus },
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub phase: AuthPhase,
    /// True until the first auth-state change has been fully processed.
    pub is_loading_auth: bool,
    /// Message of the last rejected sign-in.
    pub auth_error: Option<String>,
}

impl AuthState {
    const fn initial() -> Self {
        Self {
            phase: AuthPhase::Anonymous,
            is_loading_auth: true,
            auth_error: None,
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match &self.phase {
            AuthPhase::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub const fn admin_status(&self) -> Option<AdminStatus> {
        match &self.phase {
            AuthPhase::Authenticated { admin, .. } => Some(*admin),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.admin_status().is_some_and(AdminStatus::is_admin)
    }

    /// The route-guard view of this state.
    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        RouteGuard {
            user: self.user().cloned(),
            is_admin: self.is_admin(),
            is_loading_auth: self.is_loading_auth,
            admin_pending: self.admin_status() == Some(AdminStatus::Unknown),
        }
    }

    fn set_admin_for(&mut self, uid: &Uid, status: AdminStatus) -> bool {
        match &mut self.phase {
            AuthPhase::Authenticated { user, admin } if &user.uid == uid => {
                *admin = status;
                true
            }
            _ => false,
        }
    }
}

/// What protected views consult before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    pub user: Option<AuthUser>,
    pub is_admin: bool,
    pub is_loading_auth: bool,
    admin_pending: bool,
}

/// Outcome of a route-guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Do not redirect yet; the decision is still being resolved.
    Pending,
    Allow,
    Deny,
}

impl RouteGuard {
    #[must_use]
    pub const fn decision(&self) -> GuardDecision {
        if self.is_loading_auth {
            return GuardDecision::Pending;
        }
        if self.is_admin {
            return GuardDecision::Allow;
        }
        if self.admin_pending {
            return GuardDecision::Pending;
        }
        GuardDecision::Deny
    }
}

/// Navigation requested by a session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    /// Full navigation to the site root.
    Root,
    /// Go to the admin panel.
    Admin,
}

impl Navigation {
    #[must_use]
    pub const fn path(self) -> Option<&'static str> {
        match self {
            Self::Stay => None,
            Self::Root => Some("/"),
            Self::Admin => Some("/admin"),
        }
    }
}

/// Phase-two handle returned by [`SessionCache::begin`].
#[derive(Debug)]
#[must_use = "the authoritative admin check only runs when settled"]
pub struct PendingAdminCheck {
    user: AuthUser,
}

/// Session state machine over an identity provider, the admin directory and
/// the local hint store.
pub struct SessionCache {
    identity: Arc<dyn IdentityProvider>,
    admins: AdminDirectory,
    hints: Arc<dyn KeyValueArea>,
    /// Set when a logout could not remove the persisted hint.
    hint_revoked: AtomicBool,
    state: watch::Sender<AuthState>,
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionCache {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        admins: AdminDirectory,
        hints: Arc<dyn KeyValueArea>,
    ) -> Self {
        Self {
            identity,
            admins,
            hints,
            hint_revoked: AtomicBool::new(false),
            state: watch::Sender::new(AuthState::initial()),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        self.state.borrow().guard()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn admins(&self) -> &AdminDirectory {
        &self.admins
    }

    /// Phase one of an auth-state change.
    ///
    /// With no user the session is cleared and no check is needed. With a
    /// user, the session is set and the persisted hint decides whether admin
    /// access is granted optimistically.
    pub fn begin(&self, user: Option<AuthUser>) -> Option<PendingAdminCheck> {
        let Some(user) = user else {
            self.state.send_modify(|state| {
                state.phase = AuthPhase::Anonymous;
                state.is_loading_auth = false;
            });
            return None;
        };

        let hinted = !self.hint_revoked.load(Ordering::SeqCst)
            && self
                .hints
                .get(ADMIN_HINT_KEY)
                .is_some_and(|uid| uid == user.uid.as_str());
        let admin = if hinted {
            AdminStatus::Optimistic
        } else {
            AdminStatus::Unknown
        };
        tracing::debug!(uid = %user.uid, ?admin, "Session started");

        self.state.send_modify(|state| {
            state.phase = AuthPhase::Authenticated {
                user: user.clone(),
                admin,
            };
        });

        Some(PendingAdminCheck { user })
    }

    /// Phase two: apply the authoritative admin status.
    ///
    /// Ignored if a different user (or nobody) is signed in by the time the
    /// lookup returns.
    pub async fn settle(&self, pending: PendingAdminCheck) {
        let uid = pending.user.uid;
        let status = match self.admins.is_admin(&uid).await {
            Ok(true) => AdminStatus::Confirmed,
            Ok(false) => AdminStatus::Denied,
            Err(e) => {
                tracing::warn!(%uid, error = %e, "Admin check failed, treating as non-admin");
                AdminStatus::Denied
            }
        };

        self.state.send_modify(|state| {
            if !state.set_admin_for(&uid, status) {
                tracing::debug!(%uid, "Discarding admin check for a replaced session");
            }
            state.is_loading_auth = false;
        });
    }

    /// Process one provider-reported auth-state change, both phases.
    pub async fn on_auth_change(&self, user: Option<AuthUser>) {
        if let Some(pending) = self.begin(user) {
            self.settle(pending).await;
        }
    }

    /// Follow the provider's auth-state updates until the task is aborted.
    ///
    /// The current provider state is processed first.
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        let mut updates = self.identity.subscribe();
        tokio::spawn(async move {
            loop {
                let user = updates.borrow_and_update().clone();
                self.on_auth_change(user).await;
                if updates.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Wait until the first auth change is processed and no admin check is
    /// outstanding.
    pub async fn settled(&self) -> AuthState {
        let mut rx = self.state.subscribe();
        let result = rx
            .wait_for(|state| {
                !state.is_loading_auth
                    && !matches!(
                        state.admin_status(),
                        Some(AdminStatus::Unknown | AdminStatus::Optimistic)
                    )
            })
            .await
            .map(|state| state.clone());
        result.unwrap_or_else(|_| self.state())
    }

    /// Sign in through the provider.
    ///
    /// Does not decide admin status; that happens on the resulting
    /// auth-state change. A rejected attempt while someone is signed in
    /// leaves that session in place; the provider still holds it.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError`; `AuthError::Rejected` carries the
    /// provider's message, which is also recorded in `auth_error`.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.state.send_modify(|state| {
            if state.phase == AuthPhase::Anonymous {
                state.phase = AuthPhase::Authenticating;
            }
            state.auth_error = None;
        });

        match self.identity.sign_in(email, password).await {
            Ok(user) => {
                self.state.send_modify(|state| {
                    // The provider's own update may already have landed.
                    if state.phase == AuthPhase::Authenticating {
                        state.phase = AuthPhase::Authenticated {
                            user: user.clone(),
                            admin: AdminStatus::Unknown,
                        };
                    }
                });
                Ok(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "Sign-in rejected");
                self.state.send_modify(|state| {
                    if state.phase == AuthPhase::Authenticating {
                        state.phase = AuthPhase::Anonymous;
                    }
                    state.auth_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Sign out and clear all local session state.
    ///
    /// The provider call is best-effort: local state and the persisted hint
    /// are cleared even when it fails. If the hint cannot be removed from
    /// storage, this cache stops honoring it until the next admin login.
    pub async fn logout(&self, should_redirect: bool) -> Navigation {
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "Provider sign-out failed; clearing local session anyway");
        }

        self.state.send_modify(|state| {
            state.phase = AuthPhase::Anonymous;
            state.is_loading_auth = false;
        });

        match self.hints.remove(ADMIN_HINT_KEY) {
            Ok(()) => self.hint_revoked.store(false, Ordering::SeqCst),
            Err(e) => {
                tracing::error!(error = %e, "Failed to clear admin hint, ignoring it from now on");
                self.hint_revoked.store(true, Ordering::SeqCst);
            }
        }

        if should_redirect {
            Navigation::Root
        } else {
            Navigation::Stay
        }
    }

    /// Admin login side channel.
    ///
    /// Signs in, then runs an explicit authoritative check. Only a confirmed
    /// admin keeps the session; everyone else is signed out again so no
    /// non-admin session lingers.
    ///
    /// # Errors
    ///
    /// Returns `AdminLoginError::Auth` when sign-in fails and
    /// `AdminLoginError::NotAdmin` when the check does not confirm access.
    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthUser, Navigation), AdminLoginError> {
        let user = self.login(email, password).await?;

        let confirmed = match self.admins.is_admin(&user.uid).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::warn!(uid = %user.uid, error = %e, "Admin check failed during admin login");
                false
            }
        };

        if !confirmed {
            tracing::info!(uid = %user.uid, "Admin login refused");
            self.logout(false).await;
            return Err(AdminLoginError::NotAdmin);
        }

        let persisted = self.hints.set(ADMIN_HINT_KEY, user.uid.as_str());
        if let Err(e) = &persisted {
            tracing::warn!(error = %e, "Failed to persist admin hint");
        }
        self.hint_revoked.store(persisted.is_err(), Ordering::SeqCst);
        self.state.send_modify(|state| {
            state.set_admin_for(&user.uid, AdminStatus::Confirmed);
            state.is_loading_auth = false;
        });
        tracing::info!(uid = %user.uid, "Admin login granted");

        Ok((user, Navigation::Admin))
    }
}
