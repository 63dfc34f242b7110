//! `PostgreSQL` document store.
//!
//! Documents live in `site.document` as JSONB, keyed by `(collection, id)`.
//! Queries are built at runtime so the crate compiles without a live database.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use chapter_core::{Entity, EntityId, Fields, SortSpec};

use super::{DocumentStore, StoreError};

/// Document store backed by the site database.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_fields(collection: &str, id: &str, data: Value) -> Result<Fields, StoreError> {
    match data {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::DataCorruption(format!(
            "{collection}/{id} is not a JSON object: {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_all(
        &self,
        collection: &str,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Entity>, StoreError> {
        let rows: Vec<(String, Value)> = match sort {
            Some(spec) => {
                // Direction keywords come from the enum, never from input.
                let order = if spec.is_descending() {
                    "DESC NULLS LAST"
                } else {
                    "ASC NULLS FIRST"
                };
                let sql = format!(
                    "SELECT id, data FROM site.document \
                     WHERE collection = $1 \
                     ORDER BY data -> $2 {order}, created_at, id"
                );
                sqlx::query_as(&sql)
                    .bind(collection)
                    .bind(spec.field())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, data FROM site.document \
                     WHERE collection = $1 \
                     ORDER BY created_at, id",
                )
                .bind(collection)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|(id, data)| {
                let fields = into_fields(collection, &id, data)?;
                Ok(Entity::new(EntityId::new(id), fields))
            })
            .collect()
    }

    async fn insert(&self, collection: &str, fields: &Fields) -> Result<EntityId, StoreError> {
        let id = EntityId::new(Uuid::new_v4().to_string());

        sqlx::query("INSERT INTO site.document (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(fields))
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn merge_upsert(
        &self,
        collection: &str,
        id: &EntityId,
        fields: &Fields,
    ) -> Result<Fields, StoreError> {
        let (data,): (Value,) = sqlx::query_as(
            r"
            INSERT INTO site.document (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE
            SET data = site.document.data || EXCLUDED.data,
                updated_at = now()
            RETURNING data
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(fields))
        .fetch_one(&self.pool)
        .await?;

        into_fields(collection, id.as_str(), data)
    }

    async fn delete(&self, collection: &str, id: &EntityId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM site.document WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_one(
        &self,
        collection: &str,
        id: &EntityId,
    ) -> Result<Option<Entity>, StoreError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT data FROM site.document WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(data,)| {
            let fields = into_fields(collection, id.as_str(), data)?;
            Ok(Entity::new(id.clone(), fields))
        })
        .transpose()
    }
}
