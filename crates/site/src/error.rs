//! HTTP error type with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; clients only ever see a short
//! message without internal details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use chapter_core::SortSpecError;

use crate::entities::EntityError;

/// Application-level error type for the site API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Entity facade operation failed.
    #[error("Entity error: {0}")]
    Entity(#[from] EntityError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<SortSpecError> for AppError {
    fn from(err: SortSpecError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Entity(err) => match err {
                EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
                EntityError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                EntityError::RemoteWrite { .. } | EntityError::RemoteRead { .. } => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Entity(err) => match err {
                EntityError::NotFound { collection, id } => format!("{collection}/{id} not found"),
                EntityError::InvalidEmail(_) => "Invalid email address".to_owned(),
                EntityError::RemoteWrite { .. } | EntityError::RemoteRead { .. } => {
                    "Storage service error".to_owned()
                }
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chapter_core::{Email, EntityId};

    use super::*;
    use crate::store::StoreError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("collection 'orders'".to_owned());
        assert_eq!(err.to_string(), "Not found: collection 'orders'");

        let err = AppError::BadRequest("invalid input".to_owned());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("x".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::from(EntityError::NotFound {
                collection: "events".to_owned(),
                id: EntityId::new("e1"),
            })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::from(EntityError::InvalidEmail(
                Email::parse("nope").unwrap_err()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::from(EntityError::RemoteWrite {
                collection: "events".to_owned(),
                source: StoreError::Backend("down".to_owned()),
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::from(EntityError::RemoteWrite {
            collection: "events".to_owned(),
            source: StoreError::Backend("password=hunter2".to_owned()),
        });
        assert_eq!(err.client_message(), "Storage service error");
    }
}
