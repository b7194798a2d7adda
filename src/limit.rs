//! Fixed-window admission control.
//!
//! Counts requests per client IP in 15-minute windows, uniformly across all
//! routes. State lives in process memory; a restart resets every window.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::state;

pub const RATE_LIMIT_MAX: u32 = 100;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

struct Window {
    started: Instant,
    hits: u32,
}

pub struct FixedWindow {
    max: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl FixedWindow {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn try_admit(&self, key: &str) -> bool {
        self.try_admit_at(key, Instant::now())
    }

    fn try_admit_at(&self, key: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap();
        let window = clients.entry(key.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.hits = 0;
        }

        if window.hits >= self.max {
            return false;
        }

        window.hits += 1;
        true
    }
}

pub async fn rate_limit(
    State(state): State<Arc<state::State>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    if !state.limiter.try_admit(&key) {
        warn!("Rate limit exceeded for {key}");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests, please try again later" })),
        )
            .into_response();
    }

    next.run(request).await
}

/// The deployment sits behind a proxy, so a forwarded address wins over the
/// socket peer.
fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_fills_then_rejects() {
        let limiter = FixedWindow::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.try_admit_at("1.2.3.4", now));
        assert!(limiter.try_admit_at("1.2.3.4", now));
        assert!(limiter.try_admit_at("1.2.3.4", now));
        assert!(!limiter.try_admit_at("1.2.3.4", now));
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = FixedWindow::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.try_admit_at("1.2.3.4", now));
        assert!(!limiter.try_admit_at("1.2.3.4", now + Duration::from_secs(59)));
        assert!(limiter.try_admit_at("1.2.3.4", now + Duration::from_secs(60)));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = FixedWindow::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.try_admit_at("1.2.3.4", now));
        assert!(limiter.try_admit_at("5.6.7.8", now));
        assert!(!limiter.try_admit_at("1.2.3.4", now));
    }
}
