//! Public read-only content listings.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use chapter_core::{Entity, SortSpec};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters for a listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Field to order by; a leading `-` sorts descending.
    pub sort: Option<String>,
}

/// List a content collection.
///
/// Remote read failures yield an empty list rather than an error, so pages
/// keep rendering.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Entity>>> {
    let target = state
        .entities()
        .content(&collection)
        .ok_or_else(|| AppError::NotFound(format!("collection '{collection}'")))?;

    let sort = query.sort.as_deref().map(SortSpec::parse).transpose()?;
    let entities = target.list(sort.as_ref()).await;
    tracing::debug!(count = entities.len(), "Listed content");

    Ok(Json(entities))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use chapter_core::Fields;

    use crate::entities::{Entities, collections};
    use crate::routes::test_support::{app, get, send, state_with};
    use crate::store::DocumentStore;
    use crate::testing::FakeDocumentStore;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_list_sorted_events() {
        let entities = Entities::in_memory();
        for (title, date) in [("B", "2025-02-01"), ("C", "2025-03-01"), ("A", "2025-01-01")] {
            entities
                .events
                .create(fields(json!({ "title": title, "date": date })))
                .await
                .unwrap();
        }
        let state = state_with(entities);

        let (status, body) = send(app(state), get("/api/content/events?sort=-date")).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["C", "B", "A"]);
        assert!(body[0]["id"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let state = state_with(Entities::in_memory());

        let (status, _) = send(app(state.clone()), get("/api/content/admins")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app(state), get("/api/content/orders")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_sort_is_bad_request() {
        let state = state_with(Entities::in_memory());
        let (status, body) = send(app(state), get("/api/content/events?sort=-")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_remote_failure_lists_empty() {
        let store = Arc::new(FakeDocumentStore::new());
        store.put(
            collections::TEAM_MEMBERS,
            "m1",
            fields(json!({"name": "Ana"})),
        );
        let remote: Arc<dyn DocumentStore> = store.clone();
        let state = state_with(Entities::new(Some(remote)));

        let (status, body) = send(app(state.clone()), get("/api/content/teamMembers")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": "m1", "name": "Ana"}]));

        store.fail_reads(true);
        let (status, body) = send(app(state), get("/api/content/teamMembers")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
