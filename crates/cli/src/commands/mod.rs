//! CLI command implementations.
//!
//! Every command loads a [`Context`] from the site configuration. The local
//! state file (`SITE_STATE_FILE`) holds the sign-in token and the admin hint,
//! so a session started by `chapter login` is seen by later invocations.

pub mod admin;
pub mod content;
pub mod migrate;
pub mod session;
pub mod user;

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use chapter_core::SortSpecError;
use chapter_site::auth::{
    AdminDirectory, AdminLoginError, AuthError, FileKeyValue, PgIdentityProvider, SessionCache,
};
use chapter_site::config::{ConfigError, SiteConfig};
use chapter_site::db;
use chapter_site::entities::{Entities, EntityError};
use chapter_site::store::{DocumentStore, PgDocumentStore};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0} requires a database (set SITE_DATABASE_URL)")]
    NoDatabase(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    AdminLogin(#[from] AdminLoginError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("Unknown content collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(#[from] SortSpecError),

    #[error("Invalid JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Not signed in as an administrator (run `chapter login`)")]
    NotAuthorized,
}

/// Resources shared by all commands.
pub struct Context {
    config: SiteConfig,
    pool: Option<PgPool>,
    local: Arc<FileKeyValue>,
}

impl Context {
    /// Load configuration and connect to the database, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` or `CliError::Database`.
    pub async fn load() -> Result<Self, CliError> {
        let config = SiteConfig::from_env()?;

        let pool = match &config.database_url {
            Some(url) => {
                tracing::debug!("Connecting to site database...");
                Some(db::create_pool(url).await?)
            }
            None => None,
        };

        let local = Arc::new(FileKeyValue::new(config.state_file.clone()));
        Ok(Self {
            config,
            pool,
            local,
        })
    }

    /// The database pool, or `NoDatabase` naming the command that needs it.
    pub fn require_pool(&self, command: &'static str) -> Result<&PgPool, CliError> {
        self.pool.as_ref().ok_or(CliError::NoDatabase(command))
    }

    fn remote(&self) -> Option<Arc<dyn DocumentStore>> {
        self.pool
            .clone()
            .map(|pool| Arc::new(PgDocumentStore::new(pool)) as Arc<dyn DocumentStore>)
    }

    /// Collections bound to the configured backend.
    pub fn entities(&self) -> Entities {
        if self.pool.is_none() {
            tracing::warn!("No database configured, content is held in memory for this command only");
        }
        Entities::new(self.remote())
    }

    pub fn admins(&self) -> AdminDirectory {
        AdminDirectory::new(self.remote())
    }

    /// The identity provider with any persisted sign-in restored.
    pub async fn identity(&self, command: &'static str) -> Result<PgIdentityProvider, CliError> {
        let pool = self.require_pool(command)?.clone();
        Ok(PgIdentityProvider::restore(pool, self.local.clone(), self.config.session_ttl).await?)
    }

    /// A session cache over the restored sign-in.
    pub async fn session(&self, command: &'static str) -> Result<Arc<SessionCache>, CliError> {
        let identity = self.identity(command).await?;
        Ok(Arc::new(SessionCache::new(
            Arc::new(identity),
            self.admins(),
            self.local.clone(),
        )))
    }
}

/// Print a JSON value to stdout.
fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
