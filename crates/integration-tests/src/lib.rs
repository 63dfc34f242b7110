//! Integration tests for the chapter site.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (in-memory backend and fakes)
//! cargo test -p chapter-integration-tests
//!
//! # Database tests (need a migrated database)
//! TEST_DATABASE_URL=postgres://localhost/chapter_test \
//!     cargo test -p chapter-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `entity_store` - facade behavior on both backends
//! - `session_flows` - session and admin authorization flows
//! - `site_api` - HTTP API against a server on an ephemeral port
//! - `postgres` - `PostgreSQL` store and identity provider (ignored by default)

use std::net::SocketAddr;

use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use tokio::task::JoinHandle;

use chapter_core::Fields;
use chapter_site::config::SiteConfig;
use chapter_site::entities::Entities;
use chapter_site::routes;
use chapter_site::state::AppState;

/// Turn a `json!({...})` literal into a field bag.
///
/// # Panics
///
/// Panics if `value` is not a JSON object.
#[must_use]
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Site configuration with every variable unset.
///
/// # Panics
///
/// Panics if the defaults stop parsing.
#[must_use]
pub fn default_config() -> SiteConfig {
    SiteConfig::from_lookup(|_| None).unwrap_or_else(|e| panic!("default config: {e}"))
}

/// A site API server running on an ephemeral local port.
pub struct TestServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Serve the site routes over `entities`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn(entities: Entities) -> Self {
        let state = AppState::from_parts(default_config(), entities, None);
        let app = routes::routes().with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind test listener: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("local addr: {e}"));

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, task }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Connect to `TEST_DATABASE_URL` and apply migrations.
///
/// # Panics
///
/// Panics if the variable is unset or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| panic!("TEST_DATABASE_URL must be set for database tests"));
    let pool = chapter_site::db::create_pool(&SecretString::from(url))
        .await
        .unwrap_or_else(|e| panic!("connect to test database: {e}"));
    chapter_site::db::migrate(&pool)
        .await
        .unwrap_or_else(|e| panic!("migrate test database: {e}"));
    pool
}

/// A collection name unique to one test run, so tests sharing a database
/// don't see each other's documents.
#[must_use]
pub fn unique_collection(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}
