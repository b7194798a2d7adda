use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc},
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::{
    error::AppError,
    fallback::or_fallback,
    models::{Article, LikeAction},
    state,
    utils::positive_id,
};

#[derive(Debug, Default, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStats {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    /// Always false: whether *this* browser liked the article lives in the
    /// client's local storage, the server has no notion of it.
    pub has_liked: bool,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct EngagementCounts {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikePayload {
    pub user_id: Option<String>,
    pub action: Option<String>,
}

pub async fn stats_handler(
    State(state): State<Arc<state::State>>,
    Path(article_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let article_id = positive_id(article_id)?;

    Ok(or_fallback(ArticleStats::default(), async {
        let articles = state.store.articles().await?;

        let article = match articles
            .find_one(doc! { "articleId": article_id }, None)
            .await?
        {
            Some(article) => article,
            None => {
                let article = Article::new(article_id);
                articles.insert_one(&article, None).await?;
                article
            }
        };

        let comments = state
            .store
            .comments()
            .await?
            .count_documents(doc! { "articleId": article_id }, None)
            .await? as i64;

        Ok(ArticleStats {
            views: article.total_views(),
            likes: article.total_likes(),
            comments,
            has_liked: false,
        })
    })
    .await)
}

pub async fn view_handler(
    State(state): State<Arc<state::State>>,
    Path(article_id): Path<i64>,
    Json(payload): Json<ViewPayload>,
) -> Result<impl IntoResponse, AppError> {
    let article_id = positive_id(article_id)?;

    // Once-per-session is the client's promise; the id is only checked for
    // presence here.
    if payload
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|session_id| !session_id.is_empty())
        .is_none()
    {
        return Err(AppError::BadRequest("Session ID required".to_string()));
    }

    let articles = state.store.articles().await?;

    let now = bson::DateTime::now();
    let options = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();

    let article = articles
        .find_one_and_update(
            doc! { "articleId": article_id },
            doc! {
                "$inc": { "views": 1 },
                "$set": { "updatedAt": now },
                "$setOnInsert": {
                    "likes": [],
                    "baseViews": 0,
                    "baseLikes": 0,
                    "createdAt": now,
                },
            },
            options,
        )
        .await?
        .ok_or_else(|| AppError::Internal("view upsert returned no document".into()))?;

    Ok(Json(json!({
        "views": article.total_views(),
        "message": "View recorded successfully",
    })))
}

pub async fn like_handler(
    State(state): State<Arc<state::State>>,
    Path(article_id): Path<i64>,
    Json(payload): Json<LikePayload>,
) -> Result<impl IntoResponse, AppError> {
    let article_id = positive_id(article_id)?;

    let user_id = payload
        .user_id
        .filter(|user_id| !user_id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("User ID required".to_string()))?;

    let action = payload
        .action
        .as_deref()
        .and_then(LikeAction::parse)
        .ok_or_else(|| AppError::BadRequest("Action must be 'like' or 'unlike'".to_string()))?;

    let articles = state.store.articles().await?;

    // Read-modify-write on the likes array. Two simultaneous toggles on the
    // same article can lose one update; the per-document write is the only
    // consistency boundary.
    let mut article = match articles
        .find_one(doc! { "articleId": article_id }, None)
        .await?
    {
        Some(article) => article,
        None => Article::new(article_id),
    };

    article.apply_like(&user_id, action);
    article.updated_at = Utc::now();

    if article.id.is_none() {
        articles.insert_one(&article, None).await?;
    } else {
        articles
            .update_one(
                doc! { "articleId": article_id },
                doc! { "$set": {
                    "likes": bson::to_bson(&article.likes)?,
                    "updatedAt": bson::DateTime::from_chrono(article.updated_at),
                } },
                None,
            )
            .await?;
    }

    Ok(Json(json!({
        "likes": article.total_likes(),
        "hasLiked": action == LikeAction::Like,
        "message": format!("Article {}d successfully", action.as_str()),
    })))
}

#[derive(Debug, Deserialize)]
struct CommentCount {
    #[serde(rename = "_id")]
    article_id: i64,
    count: i64,
}

/// Homepage summary: every known article's counts plus a `_totals` entry.
pub async fn all_stats_handler(
    State(state): State<Arc<state::State>>,
) -> Json<BTreeMap<String, EngagementCounts>> {
    or_fallback(BTreeMap::new(), async {
        let articles = state.store.articles().await?;
        let comments = state.store.comments().await?;

        let mut comment_counts: HashMap<i64, i64> = HashMap::new();
        let mut groups = comments
            .aggregate(
                vec![doc! { "$group": { "_id": "$articleId", "count": { "$sum": 1 } } }],
                None,
            )
            .await?;
        while let Some(group) = groups.try_next().await? {
            match bson::from_document::<CommentCount>(group) {
                Ok(group) => {
                    comment_counts.insert(group.article_id, group.count);
                }
                Err(err) => warn!("Skipping malformed comment count group: {err}"),
            }
        }

        let mut stats = BTreeMap::new();
        let mut cursor = articles.find(doc! {}, None).await?;
        while let Some(article) = cursor.try_next().await? {
            stats.insert(
                article.article_id.to_string(),
                EngagementCounts {
                    views: article.total_views(),
                    likes: article.total_likes(),
                    comments: comment_counts
                        .get(&article.article_id)
                        .copied()
                        .unwrap_or(0),
                },
            );
        }

        let totals = sum_counts(stats.values());
        stats.insert("_totals".to_string(), totals);

        Ok(stats)
    })
    .await
}

fn sum_counts<'a>(entries: impl Iterator<Item = &'a EngagementCounts>) -> EngagementCounts {
    entries.fold(EngagementCounts::default(), |acc, entry| EngagementCounts {
        views: acc.views + entry.views,
        likes: acc.likes + entry.likes,
        comments: acc.comments + entry.comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_every_entry() {
        let entries = [
            EngagementCounts {
                views: 2400,
                likes: 127,
                comments: 4,
            },
            EngagementCounts {
                views: 3100,
                likes: 203,
                comments: 0,
            },
            EngagementCounts {
                views: 1,
                likes: 0,
                comments: 9,
            },
        ];

        let totals = sum_counts(entries.iter());
        assert_eq!(totals.views, 5501);
        assert_eq!(totals.likes, 330);
        assert_eq!(totals.comments, 13);
    }

    #[test]
    fn totals_of_nothing_are_zero() {
        let totals = sum_counts(std::iter::empty());
        assert_eq!(totals.views, 0);
        assert_eq!(totals.likes, 0);
        assert_eq!(totals.comments, 0);
    }
}
