use axum::{
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde_json::json;

pub mod articles;
pub mod comments;
pub mod health;
pub mod newsletter;

pub use articles::{all_stats_handler, like_handler, stats_handler, view_handler};
pub use comments::{create_comment_handler, list_comments_handler};
pub use health::{health_handler, root_handler};
pub use newsletter::{list_subscriptions_handler, subscribe_handler};

pub async fn not_found_handler(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "path": uri.path(),
            "method": method.as_str(),
            "message": "The requested endpoint does not exist",
        })),
    )
}
