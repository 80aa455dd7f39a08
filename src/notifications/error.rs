use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors surfaced by the notification service.
///
/// `NotFound` covers both a missing record and a record owned by another
/// actor, callers cannot tell the two apart.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl NotificationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NotificationError::NotFound(_) => StatusCode::NOT_FOUND,
            NotificationError::Validation(_) => StatusCode::BAD_REQUEST,
            NotificationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let NotificationError::Storage(err) = &self {
            tracing::error!("Notification storage failure: {:#}", err);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
