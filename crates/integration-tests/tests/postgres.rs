//! `PostgreSQL` document store and identity provider.
//!
//! These tests require a reachable database in `TEST_DATABASE_URL`.
//! Run with: cargo test -p chapter-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;

use chapter_core::{EntityId, SortSpec};
use chapter_integration_tests::{default_config, fields, test_pool, unique_collection};
use chapter_site::auth::{AuthError, IdentityProvider, MemoryKeyValue, PgIdentityProvider};
use chapter_site::store::{DocumentStore, PgDocumentStore};

fn unique_email() -> String {
    format!("test-{}@club.org", uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_document_round_trip_and_merge() {
    let store = PgDocumentStore::new(test_pool().await);
    let collection = unique_collection("events");

    let id = store
        .insert(&collection, &fields(json!({"title": "Meeting", "date": "2025-01-01"})))
        .await
        .unwrap();
    let merged = store
        .merge_upsert(&collection, &id, &fields(json!({"title": "Meeting 2"})))
        .await
        .unwrap();
    assert_eq!(merged["title"], "Meeting 2");
    assert_eq!(merged["date"], "2025-01-01");

    let fetched = store.get_one(&collection, &id).await.unwrap().unwrap();
    assert_eq!(fetched.fields, merged);

    store.delete(&collection, &id).await.unwrap();
    store.delete(&collection, &id).await.unwrap();
    assert!(store.get_one(&collection, &id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_merge_upsert_creates_missing_document() {
    let store = PgDocumentStore::new(test_pool().await);
    let collection = unique_collection("siteSettings");
    let id = EntityId::new("main");

    store
        .merge_upsert(&collection, &id, &fields(json!({"siteName": "Club"})))
        .await
        .unwrap();
    let all = store.get_all(&collection, None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_sorted_listing() {
    let store = PgDocumentStore::new(test_pool().await);
    let collection = unique_collection("events");
    for date in ["2025-02-01", "2025-03-01", "2025-01-01"] {
        store
            .insert(&collection, &fields(json!({ "date": date })))
            .await
            .unwrap();
    }

    let listed = store
        .get_all(&collection, Some(&SortSpec::descending("date")))
        .await
        .unwrap();
    let dates: Vec<_> = listed.iter().filter_map(|e| e.get_str("date")).collect();
    assert_eq!(dates, ["2025-03-01", "2025-02-01", "2025-01-01"]);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_sorted_listing_mixed_kinds_use_jsonb_order() {
    let store = PgDocumentStore::new(test_pool().await);
    let collection = unique_collection("teamMembers");
    let documents = [
        json!({"name": "bool", "order": true}),
        json!({"name": "number", "order": 1}),
        json!({"name": "string", "order": "a"}),
        json!({"name": "null", "order": null}),
        json!({"name": "missing"}),
    ];
    for document in documents {
        store.insert(&collection, &fields(document)).await.unwrap();
    }

    let listed = store
        .get_all(&collection, Some(&SortSpec::ascending("order")))
        .await
        .unwrap();
    let names: Vec<_> = listed.iter().filter_map(|e| e.get_str("name")).collect();
    assert_eq!(names, ["missing", "null", "string", "number", "bool"]);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_account_sign_in_restore_and_sign_out() {
    let pool = test_pool().await;
    let tokens = Arc::new(MemoryKeyValue::new());
    let ttl = default_config().session_ttl;
    let email = unique_email();

    let provider = PgIdentityProvider::restore(pool.clone(), tokens.clone(), ttl)
        .await
        .unwrap();
    let created = provider.create_account(&email, "long enough").await.unwrap();
    assert!(matches!(
        provider.create_account(&email, "long enough").await,
        Err(AuthError::AccountExists)
    ));

    assert!(matches!(
        provider.sign_in(&email, "wrong password").await,
        Err(AuthError::Rejected(_))
    ));
    let user = provider.sign_in(&email, "long enough").await.unwrap();
    assert_eq!(user, created);

    // A new provider over the same local storage restores the session
    let restored = PgIdentityProvider::restore(pool.clone(), tokens.clone(), ttl)
        .await
        .unwrap();
    assert_eq!(restored.subscribe().borrow().as_ref(), Some(&created));

    restored.sign_out().await.unwrap();
    assert!(restored.subscribe().borrow().is_none());

    let after = PgIdentityProvider::restore(pool, tokens, ttl).await.unwrap();
    assert!(after.subscribe().borrow().is_none());
}
