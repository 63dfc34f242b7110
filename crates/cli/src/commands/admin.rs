//! Admin record management.
//!
//! ```bash
//! chapter admin grant <uid>
//! chapter admin revoke <uid>
//! ```
//!
//! A user becomes an administrator when a record keyed by their uid exists in
//! the `admins` collection. Only operators with database access can write it.

use chapter_core::Uid;

use super::{CliError, Context};

/// Grant admin access to `uid`.
pub async fn grant(ctx: &Context, uid: &str) -> Result<(), CliError> {
    ctx.require_pool("admin grant")?;
    ctx.admins().grant(&Uid::new(uid)).await?;
    tracing::info!("User {uid} is now an admin");
    Ok(())
}

/// Revoke admin access from `uid`.
pub async fn revoke(ctx: &Context, uid: &str) -> Result<(), CliError> {
    ctx.require_pool("admin revoke")?;
    ctx.admins().revoke(&Uid::new(uid)).await?;
    tracing::info!("User {uid} is no longer an admin");
    Ok(())
}
