use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::state;

pub async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "STEM October Forum API",
        "status": "running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Never errors; a down database is reported, not propagated.
pub async fn health_handler(State(state): State<Arc<state::State>>) -> impl IntoResponse {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "OK",
        "message": "Server is running",
        "database": database,
    }))
}
