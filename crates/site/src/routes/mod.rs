//! HTTP route handlers for the site API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database, if any)
//!
//! # Content (public, read-only)
//! GET  /api/content/{collection}    - List a content collection (?sort=-date)
//!
//! # Forms
//! POST /api/newsletter              - Newsletter signup
//! POST /api/events/{id}/rsvp        - RSVP for an event
//! ```
//!
//! Content is edited through the `chapter` CLI, never over HTTP.

pub mod content;
pub mod forms;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the `/api` router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/content/{collection}", get(content::list))
        .route("/newsletter", post(forms::subscribe))
        .route("/events/{id}/rsvp", post(forms::rsvp))
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::SiteConfig;
    use crate::entities::Entities;
    use crate::state::AppState;

    pub fn state_with(entities: Entities) -> AppState {
        let config = SiteConfig::from_lookup(|_| None).unwrap();
        AppState::from_parts(config, entities, None)
    }

    pub fn app(state: AppState) -> Router {
        super::routes().with_state(state)
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
