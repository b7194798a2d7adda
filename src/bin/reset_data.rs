//! Administrative reset: deletes every article record and every comment,
//! zeroing the whole site. Newsletter subscriptions are left alone.

use mongodb::bson::doc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use stem_forum_api::{config::Config, database::Store, error::AppError};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();
    let store = Store::new(&config.mongodb_uri);

    if let Err(err) = reset(&store).await {
        error!("Error resetting data: {err}");
        std::process::exit(1);
    }
}

async fn reset(store: &Store) -> Result<(), AppError> {
    info!("Starting data reset...");

    let articles = store.articles().await?;
    let deleted = articles.delete_many(doc! {}, None).await?;
    info!("Deleted {} article records", deleted.deleted_count);

    let comments = store.comments().await?;
    let deleted = comments.delete_many(doc! {}, None).await?;
    info!("Deleted {} comment records", deleted.deleted_count);

    info!("All data reset successfully");
    Ok(())
}
