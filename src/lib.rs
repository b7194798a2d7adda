//! Backend for the STEM October magazine site.
//!
//! The frontend serves the articles themselves; everything dynamic on a page
//! goes through the JSON endpoints here, backed by MongoDB: per-article view
//! counters, likes, comments, and the newsletter subscription list.
//!
//! # Endpoints
//!
//! - `GET /api/health` — service and database status
//! - `GET /api/article/:id/stats` — views/likes/comments for one article
//! - `POST /api/article/:id/view` — count a view (`{sessionId}`)
//! - `POST /api/article/:id/like` — toggle a like (`{userId, action}`)
//! - `GET /api/articles/stats` — per-article counts plus `_totals`
//! - `GET /api/articles/:id/comments` — comments, newest first
//! - `POST /api/articles/:id/comments` — add a comment
//! - `POST /api/newsletter/subscribe` — sign up (`{email, source?, articleId?}`)
//! - `GET /api/newsletter/subscriptions` — admin listing with counts
//!
//! Reads degrade to zeros/empty lists when MongoDB is unreachable so the
//! page shell stays alive; writes fail loudly. The MongoDB connection is
//! opened lazily on the first request that needs it.
//!
//! # Setup
//!
//! ```sh
//! MONGODB_URI=mongodb://localhost:27017/stem-forum cargo run
//! ```
//!
//! Wipe all counters and comments:
//!
//! ```sh
//! cargo run --bin reset_data
//! ```
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod database;
pub mod error;
pub mod fallback;
pub mod limit;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use limit::rate_limit;
use routes::{
    all_stats_handler, create_comment_handler, health_handler, like_handler,
    list_comments_handler, list_subscriptions_handler, not_found_handler, root_handler,
    stats_handler, subscribe_handler, view_handler,
};
use state::State;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new();

    info!("Starting server...");

    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

    println!("Server shutting down...");
}

pub fn build_router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(allowed_origins(&state))
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/article/:id/stats", get(stats_handler))
        .route("/api/article/:id/view", post(view_handler))
        .route("/api/article/:id/like", post(like_handler))
        .route("/api/articles/stats", get(all_stats_handler))
        .route(
            "/api/articles/:id/comments",
            get(list_comments_handler).post(create_comment_handler),
        )
        .route("/api/newsletter/subscribe", post(subscribe_handler))
        .route(
            "/api/newsletter/subscriptions",
            get(list_subscriptions_handler),
        )
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

fn allowed_origins(state: &State) -> AllowOrigin {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse()
                .map_err(|_| warn!("Ignoring invalid origin: {origin}"))
                .ok()
        })
        .collect();

    AllowOrigin::list(origins)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
