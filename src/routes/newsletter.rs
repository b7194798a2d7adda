use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc},
    options::FindOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::AppError,
    models::NewsletterSubscription,
    state,
    utils::{is_valid_email, normalize_email},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub email: Option<String>,
    pub source: Option<String>,
    pub article_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub email: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_id: Option<i64>,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
}

impl From<NewsletterSubscription> for SubscriptionResponse {
    fn from(subscription: NewsletterSubscription) -> Self {
        Self {
            email: subscription.email,
            source: subscription.source,
            article_id: subscription.article_id,
            is_active: subscription.is_active,
            subscribed_at: subscription.created_at,
        }
    }
}

pub async fn subscribe_handler(
    State(state): State<Arc<state::State>>,
    Json(payload): Json<SubscribePayload>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|email| is_valid_email(email))
        .ok_or_else(|| AppError::BadRequest("A valid email address is required".to_string()))?;

    let subscriptions = state.store.subscriptions().await?;

    match subscriptions.find_one(doc! { "email": &email }, None).await? {
        Some(existing) if existing.is_active => Err(AppError::Conflict(
            "This email is already subscribed".to_string(),
        )),
        Some(mut existing) => {
            // Resubscribe: flip the existing record back on instead of
            // inserting a duplicate.
            existing.is_active = true;
            if let Some(source) = payload.source {
                existing.source = source;
            }
            if payload.article_id.is_some() {
                existing.article_id = payload.article_id;
            }
            existing.updated_at = Utc::now();

            subscriptions
                .update_one(
                    doc! { "email": &email },
                    doc! { "$set": {
                        "isActive": true,
                        "source": &existing.source,
                        "articleId": existing.article_id,
                        "updatedAt": bson::DateTime::from_chrono(existing.updated_at),
                    } },
                    None,
                )
                .await?;

            Ok((
                StatusCode::OK,
                Json(json!({
                    "message": "Subscription reactivated",
                    "subscription": SubscriptionResponse::from(existing),
                })),
            ))
        }
        None => {
            let subscription =
                NewsletterSubscription::new(email, payload.source, payload.article_id);
            subscriptions.insert_one(&subscription, None).await?;

            Ok((
                StatusCode::CREATED,
                Json(json!({
                    "message": "Subscribed successfully",
                    "subscription": SubscriptionResponse::from(subscription),
                })),
            ))
        }
    }
}

/// Admin view of the list, filterable on `?active=`, with overall counts.
pub async fn list_subscriptions_handler(
    State(state): State<Arc<state::State>>,
    Query(query): Query<SubscriptionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let subscriptions = state.store.subscriptions().await?;

    let filter = match query.active {
        Some(active) => doc! { "isActive": active },
        None => doc! {},
    };

    let options = FindOptions::builder()
        .sort(doc! { "createdAt": -1 })
        .build();
    let found: Vec<NewsletterSubscription> =
        subscriptions.find(filter, options).await?.try_collect().await?;

    let total = subscriptions.count_documents(doc! {}, None).await?;
    let active = subscriptions
        .count_documents(doc! { "isActive": true }, None)
        .await?;

    let listed: Vec<SubscriptionResponse> = found
        .into_iter()
        .map(SubscriptionResponse::from)
        .collect();

    Ok(Json(json!({
        "total": total,
        "active": active,
        "count": listed.len(),
        "subscriptions": listed,
    })))
}
