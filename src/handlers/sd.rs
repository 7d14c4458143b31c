//! Service discovery endpoint handler.
//!
//! `/sd` returns a Prometheus file-SD document listing every agent known to
//! the configured master, or the literal `null` when that master cannot be
//! reached or the exporter watches a single agent.

use axum::{extract::State, response::IntoResponse};
use herakles_mesos_exporter::discovery::UNREACHABLE;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /sd endpoint.
#[instrument(skip(state))]
pub async fn sd_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /sd request");
    state.health_stats.record_http_request();

    let body = match &state.discovery {
        Some(discovery) => discovery.render(&state.client).await,
        None => {
            debug!("Service discovery is only served in master mode");
            UNREACHABLE.to_string()
        }
    };
    state.health_stats.record_sd_request(body != UNREACHABLE);

    ([("Content-Type", "application/json")], body)
}
