//! Fetching JSON documents from the resolved leader.
//!
//! There is no retry here. The monitoring system's poll interval is the retry
//! mechanism.

use serde::de::DeserializeOwned;
use url::Url;

use crate::cluster::Snapshot;
use crate::error::TransportError;
use crate::transport::{endpoint, HttpClient};

/// Path of the flat metrics snapshot on masters and agents.
pub const SNAPSHOT_PATH: &str = "/metrics/snapshot";

/// Path of the per-executor resource statistics on agents.
pub const MONITOR_PATH: &str = "/monitor/statistics";

/// GETs `path` under `base` and decodes the body as `D`.
pub async fn fetch_document<D: DeserializeOwned>(
    client: &HttpClient,
    base: &Url,
    path: &str,
) -> Result<D, TransportError> {
    client.get_json(endpoint(base, path)?).await
}

/// Fetches the metrics snapshot of `leader`.
pub async fn fetch_snapshot(client: &HttpClient, leader: &Url) -> Result<Snapshot, TransportError> {
    fetch_document(client, leader, SNAPSHOT_PATH).await
}
