use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use super::api::ApiError;
use crate::observability::Metrics;

/// Prometheus text exposition format
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Scrape endpoint for the HTTP, DynamoDB and recipe counters
#[instrument(name = "metrics_handler", skip(metrics))]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Result<Response, ApiError> {
    let body = metrics.encode().map_err(|err| {
        crate::error_with_trace!("Metrics scrape failed: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Metrics unavailable",
                "message": err.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
    })?;

    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn scrape(metrics: Arc<Metrics>) -> (StatusCode, String, String) {
        let response = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(metrics)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_scrape_reports_recorded_operations() {
        let metrics = Arc::new(Metrics::new().unwrap());
        metrics.record_http_request("GET", "/api/recipes/:recipe_id", 200, 0.012);
        metrics.record_database_operation("create_tables", "all", true, 0.050);
        metrics.record_shopping_list_download("txt");

        let (status, content_type, body) = scrape(metrics).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, METRICS_CONTENT_TYPE);
        assert!(body.contains("/api/recipes/:recipe_id"));
        assert!(body.contains("create_tables"));
        assert!(body.contains("shopping_list_downloads_total{format=\"txt\"} 1"));
    }

    #[tokio::test]
    async fn test_scrape_of_fresh_registry() {
        let (status, _, body) = scrape(Arc::new(Metrics::new().unwrap())).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("shopping_list_downloads_total{"));
    }
}
