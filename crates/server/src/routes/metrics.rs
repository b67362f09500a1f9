//! Prometheus exposition, served on its own listener.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use services::services::telemetry::MetricSink;
use utils::response::{ApiResponse, ErrorCode};

const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub async fn export_metrics(State(sink): State<Arc<dyn MetricSink>>) -> Response {
    match sink.render() {
        Some(Ok(text)) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], text).into_response(),
        Some(Err(e)) => {
            tracing::error!("Failed to encode metrics: {}", e);
            ApiResponse::<()>::failure(ErrorCode::InternalError, "Failed to encode metrics")
                .into_response()
        }
        None => ApiResponse::<()>::failure(ErrorCode::NotFound, "Metrics are disabled")
            .into_response(),
    }
}

pub fn router(sink: Arc<dyn MetricSink>) -> Router {
    Router::new()
        .route("/metrics", get(export_metrics))
        .with_state(sink)
}
