//! In-process fakes for the external collaborators.
//!
//! These stand in for the hosted document store and identity provider in unit
//! and integration tests, and let the site run with no backend at all.
//! Both support failure injection so fail-soft and fail-closed paths can be
//! exercised deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use chapter_core::{AuthUser, Email, Entity, EntityId, Fields, SortSpec, Uid};

use crate::auth::{AuthError, IdentityProvider};
use crate::store::{DocumentStore, StoreError};

/// Document store held in process memory.
#[derive(Debug, Default)]
pub struct FakeDocumentStore {
    collections: Mutex<HashMap<String, Vec<Entity>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a document directly, bypassing failure injection.
    pub fn put(&self, collection: &str, id: impl Into<EntityId>, fields: Fields) {
        let entity = Entity::new(id.into(), fields);
        let mut collections = self.lock();
        let documents = collections.entry(collection.to_owned()).or_default();
        documents.retain(|existing| existing.id != entity.id);
        documents.push(entity);
    }

    #[must_use]
    pub fn document_count(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Entity>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated read failure".to_owned()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated write failure".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn get_all(
        &self,
        collection: &str,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Entity>, StoreError> {
        self.check_read()?;
        let mut documents = self.lock().get(collection).cloned().unwrap_or_default();
        if let Some(spec) = sort {
            spec.sort(&mut documents);
        }
        Ok(documents)
    }

    async fn insert(&self, collection: &str, fields: &Fields) -> Result<EntityId, StoreError> {
        self.check_write()?;
        let id = EntityId::new(Uuid::new_v4().to_string());
        self.lock()
            .entry(collection.to_owned())
            .or_default()
            .push(Entity::new(id.clone(), fields.clone()));
        Ok(id)
    }

    async fn merge_upsert(
        &self,
        collection: &str,
        id: &EntityId,
        fields: &Fields,
    ) -> Result<Fields, StoreError> {
        self.check_write()?;
        let mut collections = self.lock();
        let documents = collections.entry(collection.to_owned()).or_default();
        if let Some(existing) = documents.iter_mut().find(|entity| &entity.id == id) {
            existing.merge(fields.clone());
            return Ok(existing.fields.clone());
        }
        let entity = Entity::new(id.clone(), fields.clone());
        let merged = entity.fields.clone();
        documents.push(entity);
        Ok(merged)
    }

    async fn delete(&self, collection: &str, id: &EntityId) -> Result<(), StoreError> {
        self.check_write()?;
        if let Some(documents) = self.lock().get_mut(collection) {
            documents.retain(|entity| &entity.id != id);
        }
        Ok(())
    }

    async fn get_one(
        &self,
        collection: &str,
        id: &EntityId,
    ) -> Result<Option<Entity>, StoreError> {
        self.check_read()?;
        Ok(self
            .lock()
            .get(collection)
            .and_then(|documents| documents.iter().find(|entity| &entity.id == id))
            .cloned())
    }
}

/// Identity provider with a fixed account table.
#[derive(Debug)]
pub struct FakeIdentityProvider {
    accounts: Mutex<HashMap<String, (Uid, String)>>,
    current: watch::Sender<Option<AuthUser>>,
    fail_sign_out: AtomicBool,
}

impl Default for FakeIdentityProvider {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: watch::Sender::new(None),
            fail_sign_out: AtomicBool::new(false),
        }
    }
}

impl FakeIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return its uid.
    pub fn add_account(&self, email: &str, password: &str) -> Uid {
        let uid = Uid::new(format!("uid-{}", Uuid::new_v4().simple()));
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(email.to_lowercase(), (uid.clone(), password.to_owned()));
        uid
    }

    /// Publish an auth-state change as if the provider restored a session.
    pub fn set_current(&self, user: Option<AuthUser>) {
        self.current.send_replace(user);
    }

    #[must_use]
    pub fn current(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let rejected = || AuthError::Rejected("invalid email or password".to_owned());
        let email = Email::parse(email).map_err(|_| rejected())?;

        let uid = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            match accounts.get(email.as_str()) {
                Some((uid, stored)) if stored == password => uid.clone(),
                _ => return Err(rejected()),
            }
        };

        let user = AuthUser { uid, email };
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable(
                "simulated sign-out failure".to_owned(),
            ));
        }
        self.current.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }
}
