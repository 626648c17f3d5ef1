use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orchestrator_queue::QueueError;
use orchestrator_store::errors::DatabaseError;
use serde_json::json;
use thiserror::Error;

/// Translates domain errors from the Queue into HTTP statuses. Request parsing, auth and rate
/// limiting are explicitly out of scope; this only covers the minimum needed to expose the
/// Queue's inspection and mutation verbs over REST.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("item {0} not found")]
    ItemNotFound(i64),

    #[error("queue error")]
    Queue(#[from] QueueError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Queue(QueueError::InvalidAmount(_)) => StatusCode::BAD_REQUEST,
            ApiError::Queue(QueueError::Store(DatabaseError::BatchNotFound(_) | DatabaseError::ItemNotFound(_))) => {
                StatusCode::NOT_FOUND
            },
            ApiError::Queue(QueueError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Errors that can abort the process before it starts serving: configuration, store-open, and
/// bind failures. Per the error handling design, these are fatal; runtime Store failures are not.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load configuration")]
    Config(#[from] figment::Error),

    #[error("failed to write default configuration file")]
    WriteConfig(#[from] toml::ser::Error),

    #[error("failed to open store")]
    Store(#[from] orchestrator_store::errors::DatabaseSetupError),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

