//! Public form submissions: newsletter signup and event RSVP.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use chapter_core::{Entity, EntityId, Fields};

use crate::error::Result;
use crate::state::AppState;

/// Newsletter signup body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Subscribe an email address to the newsletter.
#[instrument(skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Entity>)> {
    let entry = state
        .entities()
        .subscribe_newsletter(&request.email)
        .await?;
    tracing::info!(id = %entry.id, "Newsletter subscription recorded");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// RSVP for an event.
///
/// The body is a free-form object (name, email, guests, ...). The event id
/// and title are taken from the stored event.
#[instrument(skip(state, fields))]
pub async fn rsvp(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(fields): Json<Fields>,
) -> Result<(StatusCode, Json<Entity>)> {
    let entry = state
        .entities()
        .rsvp(&EntityId::new(event_id), fields)
        .await?;
    tracing::info!(id = %entry.id, "RSVP recorded");
    Ok((StatusCode::CREATED, Json(entry)))
}
