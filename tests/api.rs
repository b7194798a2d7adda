//! Drives the router in-process with an unreachable MongoDB so the
//! validation, degrade, and admission-control paths are all exercised
//! without a live database.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use stem_forum_api::{build_router, config::Config, state::State};

// Nothing listens on port 9; short timeouts keep the failure paths fast.
const UNREACHABLE_URI: &str = "mongodb://127.0.0.1:9/stem-forum-test?serverSelectionTimeoutMS=200&connectTimeoutMS=200&directConnection=true";

fn test_router() -> Router {
    let config = Config {
        port: 0,
        mongodb_uri: UNREACHABLE_URI.to_string(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
    };
    build_router(State::with_config(config))
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn post_json(path: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn root_reports_running() {
    let (status, body) = send(test_router(), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn health_reports_disconnected_database_without_erroring() {
    let (status, body) = send(test_router(), get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn stats_degrade_to_zeros_when_the_store_is_down() {
    let (status, body) = send(test_router(), get("/api/article/7/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["views"], 0);
    assert_eq!(body["likes"], 0);
    assert_eq!(body["comments"], 0);
    assert_eq!(body["hasLiked"], false);
}

#[tokio::test]
async fn aggregate_stats_degrade_to_an_empty_map() {
    let (status, body) = send(test_router(), get("/api/articles/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn comment_list_degrades_to_an_empty_array() {
    let (status, body) = send(test_router(), get("/api/articles/7/comments")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn non_positive_article_ids_are_rejected() {
    let (status, _) = send(test_router(), get("/api/article/0/stats")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(test_router(), get("/api/article/-3/stats")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn view_requires_a_session_id() {
    let (status, body) = send(test_router(), post_json("/api/article/7/view", json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Session ID required");
}

#[tokio::test]
async fn view_write_path_surfaces_a_500_when_the_store_is_down() {
    let (status, _) = send(
        test_router(),
        post_json("/api/article/7/view", json!({ "sessionId": "s1" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn like_requires_a_user_id() {
    let (status, body) = send(
        test_router(),
        post_json("/api/article/7/like", json!({ "action": "like" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User ID required");
}

#[tokio::test]
async fn like_rejects_unknown_actions() {
    let (status, body) = send(
        test_router(),
        post_json(
            "/api/article/7/like",
            json!({ "userId": "u1", "action": "boost" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Action must be 'like' or 'unlike'");
}

#[tokio::test]
async fn empty_comments_are_rejected() {
    let (status, body) = send(
        test_router(),
        post_json(
            "/api/articles/7/comments",
            json!({ "content": "   ", "userId": "u1" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Comment content is required");
}

#[tokio::test]
async fn overlong_comments_are_rejected() {
    let (status, body) = send(
        test_router(),
        post_json(
            "/api/articles/7/comments",
            json!({ "content": "x".repeat(1001), "userId": "u1" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Comment is too long");
}

#[tokio::test]
async fn subscribe_rejects_invalid_emails() {
    let (status, body) = send(
        test_router(),
        post_json("/api/newsletter/subscribe", json!({ "email": "not-an-email" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A valid email address is required");
}

#[tokio::test]
async fn unknown_routes_echo_path_and_method() {
    let (status, body) = send(test_router(), get("/api/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
    assert_eq!(body["path"], "/api/nope");
    assert_eq!(body["method"], "GET");
}

#[tokio::test]
async fn the_rate_limit_window_closes_after_100_requests() {
    let router = test_router();

    for _ in 0..100 {
        let (status, _) = send(router.clone(), get("/")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(router, get("/")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests, please try again later");
}

#[tokio::test]
async fn forwarded_addresses_are_limited_independently() {
    let router = test_router();

    for _ in 0..100 {
        let request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
    }

    // The exhausted address is cut off, a different one still gets through.
    let request = Request::builder()
        .uri("/")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router.clone(), request).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let request = Request::builder()
        .uri("/")
        .header("x-forwarded-for", "198.51.100.7")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
}
