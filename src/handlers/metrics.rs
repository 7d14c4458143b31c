//! Metrics endpoint handler for Prometheus scraping.
//!
//! Every request gathers the registry, which runs one full collection cycle
//! against the current leader. Gathering blocks, so it runs on the blocking pool.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 64 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    GatherFailed,
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        let message = match self {
            MetricsError::GatherFailed => "Failed to collect metrics",
            MetricsError::EncodingFailed => "Failed to encode metrics",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");
    state.health_stats.record_http_request();

    let registry = state.registry.clone();
    let families = match tokio::task::spawn_blocking(move || registry.gather()).await {
        Ok(families) => families,
        Err(e) => {
            error!("Metrics collection task failed: {}", e);
            state.health_stats.record_scrape_failure();
            return Err(MetricsError::GatherFailed);
        }
    };

    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!("Failed to encode Prometheus metrics: {}", e);
        state.health_stats.record_scrape_failure();
        return Err(MetricsError::EncodingFailed);
    }

    let elapsed = start.elapsed().as_secs_f64();
    state.health_stats.record_scrape(elapsed, families.len());

    debug!(
        "Metrics request completed: {} families, {} bytes, {:.3}ms",
        families.len(),
        buffer.len(),
        elapsed * 1000.0
    );

    String::from_utf8(buffer).map_err(|_| MetricsError::EncodingFailed)
}
