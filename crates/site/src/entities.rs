//! Entity store facade.
//!
//! Every content collection (settings, events, team members, contact entries)
//! shares one [`Collection`] implementation. A collection is bound to its
//! backend once, at construction: the remote document store when one is
//! configured, otherwise an in-process list. There is no runtime switching.
//!
//! # Error polarity
//!
//! - `list` is fail-soft: a remote read failure is logged and an empty
//!   listing is returned, so pages still render.
//! - `create`, `update` and `delete` surface remote failures to the caller.
//!   Missing ids are never errors.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use chapter_core::{Email, EmailError, Entity, EntityId, Fields, SortSpec};

use crate::store::{DocumentStore, StoreError};

/// Logical collection names.
pub mod collections {
    pub const SITE_SETTINGS: &str = "siteSettings";
    pub const EVENTS: &str = "events";
    pub const TEAM_MEMBERS: &str = "teamMembers";
    pub const CONTACT_INFO: &str = "contactInfo";
    pub const NEWSLETTER_SUBSCRIBERS: &str = "newsletterSubscribers";
    pub const RSVPS: &str = "rsvps";
    pub const ADMINS: &str = "admins";
}

/// Errors surfaced by collection writes and public submissions.
#[derive(Debug, Error)]
pub enum EntityError {
    /// The remote store failed a write; nothing was rolled back locally.
    #[error("write to '{collection}' failed: {source}")]
    RemoteWrite {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// The remote store failed a single-document read.
    #[error("read from '{collection}' failed: {source}")]
    RemoteRead {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// A referenced entity does not exist.
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: EntityId },

    /// Submitted email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Storage behind a collection, chosen once per instance.
pub enum Backend {
    /// Hosted document database.
    Remote(Arc<dyn DocumentStore>),
    /// Process-local list in insertion order.
    InMemory(Mutex<Vec<Entity>>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(_) => f.write_str("Remote"),
            Self::InMemory(_) => f.write_str("InMemory"),
        }
    }
}

/// Handle to one logical collection.
#[derive(Debug)]
pub struct Collection {
    name: String,
    backend: Backend,
}

impl Collection {
    /// Bind `name` to the remote store when one is available, else to memory.
    #[must_use]
    pub fn new(name: impl Into<String>, remote: Option<Arc<dyn DocumentStore>>) -> Self {
        let backend = match remote {
            Some(store) => Backend::Remote(store),
            None => Backend::InMemory(Mutex::new(Vec::new())),
        };
        Self::with_backend(name, backend)
    }

    #[must_use]
    pub fn with_backend(name: impl Into<String>, backend: Backend) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }

    #[must_use]
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote(_))
    }

    /// All entities, ordered by `sort` when given.
    ///
    /// Without a sort, the in-memory backend returns insertion order and the
    /// remote order is whatever the store yields. Never fails: a remote error
    /// is logged and yields an empty listing.
    pub async fn list(&self, sort: Option<&SortSpec>) -> Vec<Entity> {
        match &self.backend {
            Backend::Remote(store) => match store.get_all(&self.name, sort).await {
                Ok(entities) => entities,
                Err(e) => {
                    tracing::error!(
                        collection = %self.name,
                        error = %e,
                        "Remote list failed, serving empty listing"
                    );
                    Vec::new()
                }
            },
            Backend::InMemory(memory) => {
                let mut entities = memory.lock().await.clone();
                if let Some(spec) = sort {
                    spec.sort(&mut entities);
                }
                entities
            }
        }
    }

    /// Fetch one entity by id.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::RemoteRead` if the remote store fails.
    pub async fn get(&self, id: &EntityId) -> Result<Option<Entity>, EntityError> {
        match &self.backend {
            Backend::Remote(store) => {
                store
                    .get_one(&self.name, id)
                    .await
                    .map_err(|source| EntityError::RemoteRead {
                        collection: self.name.clone(),
                        source,
                    })
            }
            Backend::InMemory(memory) => Ok(memory
                .lock()
                .await
                .iter()
                .find(|entity| &entity.id == id)
                .cloned()),
        }
    }

    /// Persist a new entity under a freshly assigned id.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::RemoteWrite` if the remote store fails.
    pub async fn create(&self, fields: Fields) -> Result<Entity, EntityError> {
        match &self.backend {
            Backend::Remote(store) => {
                let mut fields = fields;
                fields.remove("id");
                let id = store
                    .insert(&self.name, &fields)
                    .await
                    .map_err(|source| self.write_error(source))?;
                tracing::debug!(collection = %self.name, %id, "Created entity");
                Ok(Entity::new(id, fields))
            }
            Backend::InMemory(memory) => {
                let entity = Entity::new(memory_id(), fields);
                memory.lock().await.push(entity.clone());
                Ok(entity)
            }
        }
    }

    /// Merge `partial` into entity `id` and return the merged view.
    ///
    /// Both backends upsert: an unknown id is stored as a new entity holding
    /// just the submitted fields.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::RemoteWrite` if the remote store fails.
    pub async fn update(&self, id: &EntityId, partial: Fields) -> Result<Entity, EntityError> {
        match &self.backend {
            Backend::Remote(store) => {
                let mut partial = partial;
                partial.remove("id");
                let merged = store
                    .merge_upsert(&self.name, id, &partial)
                    .await
                    .map_err(|source| self.write_error(source))?;
                Ok(Entity::new(id.clone(), merged))
            }
            Backend::InMemory(memory) => {
                let mut entities = memory.lock().await;
                if let Some(existing) = entities.iter_mut().find(|entity| &entity.id == id) {
                    existing.merge(partial);
                    return Ok(existing.clone());
                }
                let entity = Entity::new(id.clone(), partial);
                entities.push(entity.clone());
                Ok(entity)
            }
        }
    }

    /// Remove entity `id`; absent ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::RemoteWrite` if the remote store fails.
    pub async fn delete(&self, id: &EntityId) -> Result<EntityId, EntityError> {
        match &self.backend {
            Backend::Remote(store) => {
                store
                    .delete(&self.name, id)
                    .await
                    .map_err(|source| self.write_error(source))?;
            }
            Backend::InMemory(memory) => {
                memory.lock().await.retain(|entity| &entity.id != id);
            }
        }
        Ok(id.clone())
    }

    fn write_error(&self, source: StoreError) -> EntityError {
        tracing::warn!(collection = %self.name, error = %source, "Remote write failed");
        EntityError::RemoteWrite {
            collection: self.name.clone(),
            source,
        }
    }
}

/// Time-prefixed, unguessable id for in-memory entities.
fn memory_id() -> EntityId {
    let millis = Utc::now().timestamp_millis();
    let random: u64 = rand::random();
    EntityId::new(format!("{millis}-{random:016x}"))
}

/// The site's collections, all bound to the same backend choice.
#[derive(Debug)]
pub struct Entities {
    pub site_settings: Collection,
    pub events: Collection,
    pub team_members: Collection,
    pub contact_info: Collection,
    pub newsletter_subscribers: Collection,
    pub rsvps: Collection,
}

impl Entities {
    #[must_use]
    pub fn new(remote: Option<Arc<dyn DocumentStore>>) -> Self {
        let collection = |name: &str| Collection::new(name, remote.clone());
        Self {
            site_settings: collection(collections::SITE_SETTINGS),
            events: collection(collections::EVENTS),
            team_members: collection(collections::TEAM_MEMBERS),
            contact_info: collection(collections::CONTACT_INFO),
            newsletter_subscribers: collection(collections::NEWSLETTER_SUBSCRIBERS),
            rsvps: collection(collections::RSVPS),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Content collections shown on public pages and edited by admins.
    #[must_use]
    pub fn content(&self, name: &str) -> Option<&Collection> {
        match name {
            collections::SITE_SETTINGS => Some(&self.site_settings),
            collections::EVENTS => Some(&self.events),
            collections::TEAM_MEMBERS => Some(&self.team_members),
            collections::CONTACT_INFO => Some(&self.contact_info),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.events.is_remote()
    }

    /// Record a newsletter signup.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::InvalidEmail` for a malformed address and
    /// `EntityError::RemoteWrite` if the store fails.
    pub async fn subscribe_newsletter(&self, email: &str) -> Result<Entity, EntityError> {
        let email = Email::parse(email)?;

        let mut fields = Fields::new();
        fields.insert("email".to_owned(), Value::String(email.into_inner()));
        fields.insert("createdAt".to_owned(), now_value());

        self.newsletter_subscribers.create(fields).await
    }

    /// Record an RSVP for an existing event.
    ///
    /// The event id and title are copied onto the RSVP.
    ///
    /// # Errors
    ///
    /// Returns `EntityError::NotFound` if the event does not exist, or a
    /// remote read/write error.
    pub async fn rsvp(&self, event_id: &EntityId, fields: Fields) -> Result<Entity, EntityError> {
        let event = self
            .events
            .get(event_id)
            .await?
            .ok_or_else(|| EntityError::NotFound {
                collection: collections::EVENTS.to_owned(),
                id: event_id.clone(),
            })?;

        let mut fields = fields;
        fields.insert(
            "eventId".to_owned(),
            Value::String(event_id.as_str().to_owned()),
        );
        fields.insert(
            "eventTitle".to_owned(),
            event.get("title").cloned().unwrap_or(Value::Null),
        );
        fields.insert("createdAt".to_owned(), now_value());

        self.rsvps.create(fields).await
    }
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339())
}
