//! # MongoDB
//!
//! Document store holding three collections: `articles` (counters plus the
//! likes array), `comments`, and `newsletter_subscriptions`.
//!
//! The connection is established lazily on the first request that needs it
//! and memoized. Serverless deployments cold-start before the database is
//! reachable, so nothing here runs at process startup; a failed attempt is
//! retried on the next request instead of taking the process down.

use mongodb::{bson::doc, options::IndexOptions, Client, Collection, Database, IndexModel};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::{Article, Comment, NewsletterSubscription},
};

pub const ARTICLES: &str = "articles";
pub const COMMENTS: &str = "comments";
pub const SUBSCRIPTIONS: &str = "newsletter_subscriptions";

const DEFAULT_DATABASE: &str = "stem-forum";

pub struct Store {
    uri: String,
    database: OnceCell<Database>,
}

impl Store {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: OnceCell::new(),
        }
    }

    /// Returns the shared database handle, connecting on first use.
    /// Concurrent callers share one in-flight attempt; a failure is not
    /// cached, so the next request triggers a fresh attempt.
    pub async fn ensure_connected(&self) -> Result<&Database, AppError> {
        self.database
            .get_or_try_init(|| async {
                let client = Client::with_uri_str(&self.uri).await?;
                let database = client
                    .default_database()
                    .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

                // Round trip before handing the handle out, so an
                // unreachable server surfaces here and not mid-query.
                database.run_command(doc! { "ping": 1 }, None).await?;
                info!("MongoDB connected successfully");

                create_indexes(&database).await;

                Ok::<_, mongodb::error::Error>(database)
            })
            .await
            .map_err(AppError::from)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let database = self.ensure_connected().await?;
        database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    pub async fn articles(&self) -> Result<Collection<Article>, AppError> {
        Ok(self.ensure_connected().await?.collection(ARTICLES))
    }

    pub async fn comments(&self) -> Result<Collection<Comment>, AppError> {
        Ok(self.ensure_connected().await?.collection(COMMENTS))
    }

    pub async fn subscriptions(&self) -> Result<Collection<NewsletterSubscription>, AppError> {
        Ok(self.ensure_connected().await?.collection(SUBSCRIPTIONS))
    }
}

/// Unique keys: one Article document per `articleId`, one subscription per
/// email. Failures are logged and tolerated, the collections still work
/// without the indexes.
async fn create_indexes(database: &Database) {
    let unique = IndexOptions::builder().unique(true).build();

    let article_index = IndexModel::builder()
        .keys(doc! { "articleId": 1 })
        .options(unique.clone())
        .build();
    if let Err(err) = database
        .collection::<Article>(ARTICLES)
        .create_index(article_index, None)
        .await
    {
        warn!("Failed to create articleId index: {err}");
    }

    let email_index = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(unique)
        .build();
    if let Err(err) = database
        .collection::<NewsletterSubscription>(SUBSCRIPTIONS)
        .create_index(email_index, None)
        .await
    {
        warn!("Failed to create subscription email index: {err}");
    }
}
