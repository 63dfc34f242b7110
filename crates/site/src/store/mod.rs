//! Remote document store contract.
//!
//! The entity facade talks to a hosted document database only through
//! [`DocumentStore`]. The production implementation is
//! [`PgDocumentStore`]; tests use `crate::testing::FakeDocumentStore`.

mod postgres;

pub use postgres::PgDocumentStore;

use async_trait::async_trait;
use thiserror::Error;

use chapter_core::{Entity, EntityId, Fields, SortSpec};

/// Errors raised by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The backend refused or failed the call for another reason.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Minimal contract of a hosted document database.
///
/// Collections are created implicitly on first write. Absent documents are
/// never errors: `get_one` returns `None` and `delete` is a no-op.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection`, ordered by `sort` when given.
    async fn get_all(
        &self,
        collection: &str,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Entity>, StoreError>;

    /// Insert a new document and return its store-assigned id.
    async fn insert(&self, collection: &str, fields: &Fields) -> Result<EntityId, StoreError>;

    /// Field-level merge into `id`, creating the document when absent.
    ///
    /// Returns the merged document fields.
    async fn merge_upsert(
        &self,
        collection: &str,
        id: &EntityId,
        fields: &Fields,
    ) -> Result<Fields, StoreError>;

    /// Remove `id` if present.
    async fn delete(&self, collection: &str, id: &EntityId) -> Result<(), StoreError>;

    /// Fetch a single document.
    async fn get_one(&self, collection: &str, id: &EntityId)
    -> Result<Option<Entity>, StoreError>;
}
