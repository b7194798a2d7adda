//! Stored documents.
//!
//! Field names are camelCase on disk and on the wire (`articleId`,
//! `likedAt`, `isActive`) so existing documents written by earlier
//! deployments keep deserializing.

use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const MAX_COMMENT_LENGTH: usize = 1000;

/// One engagement record per published article, created lazily the first
/// time any stats, view, or like request touches its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub article_id: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: Vec<Like>,
    /// Seed counters folded into the displayed totals.
    #[serde(default)]
    pub base_views: i64,
    #[serde(default)]
    pub base_likes: i64,
    #[serde(default = "Utc::now", with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub user_id: String,
    #[serde(default = "Utc::now", with = "chrono_datetime_as_bson_datetime")]
    pub liked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "unlike" => Some(Self::Unlike),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Unlike => "unlike",
        }
    }
}

impl Article {
    pub fn new(article_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            article_id,
            views: 0,
            likes: Vec::new(),
            base_views: 0,
            base_likes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_views(&self) -> i64 {
        self.base_views + self.views
    }

    pub fn total_likes(&self) -> i64 {
        self.base_likes + self.likes.len() as i64
    }

    /// Applies a like or unlike for `user_id` and reports whether the likes
    /// array changed. Repeating an action is a no-op: the array holds at
    /// most one entry per user.
    pub fn apply_like(&mut self, user_id: &str, action: LikeAction) -> bool {
        let existing = self.likes.iter().position(|like| like.user_id == user_id);

        match (action, existing) {
            (LikeAction::Like, None) => {
                self.likes.push(Like {
                    user_id: user_id.to_string(),
                    liked_at: Utc::now(),
                });
                true
            }
            (LikeAction::Unlike, Some(index)) => {
                self.likes.remove(index);
                true
            }
            _ => false,
        }
    }
}

/// A reader comment. Immutable once stored; only the reset tool removes
/// comments. `article_id` is a plain value, nothing guarantees a backing
/// Article document exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub article_id: i64,
    pub content: String,
    pub author: String,
    pub user_id: String,
    #[serde(default = "Utc::now", with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Validates and normalizes a submission. Content is trimmed, must be
    /// non-empty and at most [`MAX_COMMENT_LENGTH`] chars. A missing author
    /// falls back to a handle derived from the user id.
    pub fn compose(
        article_id: i64,
        content: &str,
        author: Option<String>,
        user_id: String,
    ) -> Result<Self, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest(
                "Comment content is required".to_string(),
            ));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(AppError::BadRequest("Comment is too long".to_string()));
        }

        let author = author
            .map(|author| author.trim().to_string())
            .filter(|author| !author.is_empty())
            .unwrap_or_else(|| {
                format!("User {}", user_id.chars().take(8).collect::<String>())
            });

        let now = Utc::now();
        Ok(Self {
            id: None,
            article_id,
            content: content.to_string(),
            author,
            user_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A newsletter sign-up. One document per email address; re-subscribing an
/// inactive address flips it back on instead of inserting a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<i64>,
    pub is_active: bool,
    #[serde(default = "Utc::now", with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl NewsletterSubscription {
    /// `email` must already be normalized (trimmed, lowercased).
    pub fn new(email: String, source: Option<String>, article_id: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            email,
            source: source.unwrap_or_else(|| "website".to_string()),
            article_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
