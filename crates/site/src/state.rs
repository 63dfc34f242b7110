//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::SiteConfig;
use crate::entities::Entities;
use crate::store::{DocumentStore, PgDocumentStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The pool is absent when the site runs on the
/// in-memory backend.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    entities: Entities,
    pool: Option<PgPool>,
}

impl AppState {
    /// Build state over the `PostgreSQL` document store, or in memory when
    /// no pool is given.
    #[must_use]
    pub fn new(config: SiteConfig, pool: Option<PgPool>) -> Self {
        let remote = pool
            .clone()
            .map(|pool| Arc::new(PgDocumentStore::new(pool)) as Arc<dyn DocumentStore>);
        Self::from_parts(config, Entities::new(remote), pool)
    }

    /// Build state from an already-wired facade.
    #[must_use]
    pub fn from_parts(config: SiteConfig, entities: Entities, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                entities,
                pool,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn entities(&self) -> &Entities {
        &self.inner.entities
    }

    /// Database pool, when a remote backend is configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
