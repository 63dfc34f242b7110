//! Database migration command.
//!
//! ```bash
//! chapter migrate
//! ```
//!
//! Applies `crates/site/migrations/` to `SITE_DATABASE_URL`.

use super::{CliError, Context};

/// Run site database migrations.
pub async fn run(ctx: &Context) -> Result<(), CliError> {
    let pool = ctx.require_pool("migrate")?;

    tracing::info!("Running site migrations...");
    chapter_site::db::migrate(pool).await?;
    tracing::info!("Site migrations complete!");
    Ok(())
}
