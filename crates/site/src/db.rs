//! `PostgreSQL` connection setup for the site database.
//!
//! # Database: `chapter_site`
//!
//! ## Tables (schema `site`)
//!
//! - `document` - JSONB documents keyed by `(collection, id)`
//! - `account` - Email/password sign-in accounts
//! - `auth_session` - Opaque sign-in session tokens
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p chapter-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
