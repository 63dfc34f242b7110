//! Authoritative admin records.
//!
//! A user is an administrator when a document keyed by their uid exists in
//! the `admins` collection. The record is written by operators (`chapter
//! admin grant`), never by the session cache.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use chapter_core::{EntityId, Fields, Uid};

use crate::entities::{Collection, EntityError, collections};
use crate::store::DocumentStore;

/// Server-side admin lookup over the `admins` collection.
#[derive(Debug)]
pub struct AdminDirectory {
    admins: Collection,
}

impl AdminDirectory {
    #[must_use]
    pub fn new(remote: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            admins: Collection::new(collections::ADMINS, remote),
        }
    }

    /// Whether `uid` has an admin record.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::RemoteRead` if the lookup itself failed. Callers
    /// deciding access must treat that as "not admin".
    pub async fn is_admin(&self, uid: &Uid) -> Result<bool, EntityError> {
        let record = self.admins.get(&EntityId::new(uid.as_str())).await?;
        tracing::debug!(%uid, exists = record.is_some(), "Fetched admin record");
        Ok(record.is_some())
    }

    /// Create or refresh the admin record for `uid`.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::RemoteWrite` if the store fails.
    pub async fn grant(&self, uid: &Uid) -> Result<(), EntityError> {
        let mut fields = Fields::new();
        fields.insert("role".to_owned(), Value::String("admin".to_owned()));
        fields.insert(
            "createdAt".to_owned(),
            Value::String(Utc::now().to_rfc3339()),
        );

        self.admins
            .update(&EntityId::new(uid.as_str()), fields)
            .await?;
        tracing::info!(%uid, "Admin record written");
        Ok(())
    }

    /// Remove the admin record for `uid`, if any.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::RemoteWrite` if the store fails.
    pub async fn revoke(&self, uid: &Uid) -> Result<(), EntityError> {
        self.admins.delete(&EntityId::new(uid.as_str())).await?;
        tracing::info!(%uid, "Admin record removed");
        Ok(())
    }
}
