//! Degrade-to-empty policy for read paths.
//!
//! The page shell keeps rendering when the data layer is down: reads serve
//! a declared zero/empty value with a 200 instead of surfacing a 5xx.
//! Write paths never come through here.

use std::future::Future;

use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::error::AppError;

/// Runs a data-backed read and serves `fallback` if it fails.
pub async fn or_fallback<T, F>(fallback: T, operation: F) -> Json<T>
where
    T: Serialize,
    F: Future<Output = Result<T, AppError>>,
{
    match operation.await {
        Ok(value) => Json(value),
        Err(err) => {
            warn!("Data layer unavailable, serving fallback response: {err}");
            Json(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_successful_values_through() {
        let Json(value) = or_fallback(0u32, async { Ok(42u32) }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn serves_the_fallback_on_error() {
        let Json(value) = or_fallback(0u32, async {
            Err(AppError::BadRequest("boom".to_string()))
        })
        .await;
        assert_eq!(value, 0);
    }
}
