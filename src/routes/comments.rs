use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError, fallback::or_fallback, models::Comment, state, utils::positive_id,
};

/// Comment as served to the client; the object id flattens to its hex form.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub article_id: i64,
    pub content: String,
    pub author: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id.map(|id| id.to_hex()).unwrap_or_default(),
            article_id: comment.article_id,
            content: comment.content,
            author: comment.author,
            user_id: comment.user_id,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    pub content: Option<String>,
    pub author: Option<String>,
    pub user_id: Option<String>,
}

/// Newest first.
pub async fn list_comments_handler(
    State(state): State<Arc<state::State>>,
    Path(article_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let article_id = positive_id(article_id)?;

    Ok(or_fallback(Vec::new(), async {
        let comments = state.store.comments().await?;

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let found: Vec<Comment> = comments
            .find(doc! { "articleId": article_id }, options)
            .await?
            .try_collect()
            .await?;

        Ok(found.into_iter().map(CommentResponse::from).collect())
    })
    .await)
}

pub async fn create_comment_handler(
    State(state): State<Arc<state::State>>,
    Path(article_id): Path<i64>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let article_id = positive_id(article_id)?;

    let user_id = payload
        .user_id
        .filter(|user_id| !user_id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("User ID required".to_string()))?;

    let mut comment = Comment::compose(
        article_id,
        payload.content.as_deref().unwrap_or(""),
        payload.author,
        user_id,
    )?;

    let comments = state.store.comments().await?;
    let inserted = comments.insert_one(&comment, None).await?;
    comment.id = inserted.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}
