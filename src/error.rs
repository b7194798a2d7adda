use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Database { .. } | AppError::Bson { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");

            // The underlying message stays inside the process in release
            // builds.
            let message = if cfg!(debug_assertions) {
                self.to_string()
            } else {
                "Something went wrong".to_string()
            };

            return (
                status,
                Json(json!({ "error": "Internal server error", "message": message })),
            )
                .into_response();
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
