//! Sign-in, sign-out and session inspection.

use chapter_site::auth::{AdminStatus, SessionCache};

use super::{CliError, Context, print_json};

/// Admin login: only confirmed administrators keep the session.
pub async fn login(ctx: &Context, email: &str, password: &str) -> Result<(), CliError> {
    let session = ctx.session("login").await?;
    let (user, navigation) = session.admin_login(email, password).await?;

    tracing::info!(
        "Signed in as {} (admin); continue at {}",
        user.email,
        navigation.path().unwrap_or("/")
    );
    Ok(())
}

/// Sign out and clear the persisted session and admin hint.
pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    let session = ctx.session("logout").await?;
    session.logout(false).await;
    tracing::info!("Signed out");
    Ok(())
}

/// Print the current user and resolved admin status.
pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    let session = ctx.session("whoami").await?;
    let state = settle(session).await;

    let admin = match state.admin_status() {
        Some(AdminStatus::Confirmed) => "confirmed",
        Some(AdminStatus::Optimistic) => "optimistic",
        Some(AdminStatus::Denied) => "denied",
        Some(AdminStatus::Unknown) => "unknown",
        None => "none",
    };
    print_json(&serde_json::json!({
        "user": state.user(),
        "isAdmin": state.is_admin(),
        "admin": admin,
    }))
}

/// Run the cache against the restored sign-in until its status is settled.
pub(super) async fn settle(
    session: std::sync::Arc<SessionCache>,
) -> chapter_site::auth::AuthState {
    let task = session.clone().run();
    let state = session.settled().await;
    task.abort();
    state
}
