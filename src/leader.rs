//! Leader discovery across configured coordinator candidates.
//!
//! This is a best-effort self-consistency check, not a consensus protocol: a
//! candidate is the leader when the leader it advertises is itself. If several
//! candidates claim leadership the first one in configuration order wins.

use tracing::{debug, warn};
use url::Url;

use crate::cluster::ClusterState;
use crate::error::{LeaderError, TransportError};
use crate::transport::{endpoint, HttpClient};

/// Path of the state document queried on every candidate.
pub const STATE_PATH: &str = "/state";

/// Parses a comma-separated candidate list, preserving order.
pub fn parse_candidates(input: &str) -> Result<Vec<Url>, TransportError> {
    csv_list(input)
        .into_iter()
        .map(|raw| Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(raw, e)))
        .collect()
}

/// Splits a comma-separated list after removing all spaces. Empty entries are skipped.
pub fn csv_list(input: &str) -> Vec<String> {
    input
        .replace(' ', "")
        .split(',')
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// The identity a coordinator advertises for itself: `master@host:port`.
///
/// Mesos always advertises the port, so a scheme default port is spelled out.
pub fn advertised_identity(candidate: &Url) -> String {
    let host = candidate.host_str().unwrap_or_default();
    match candidate.port_or_known_default() {
        Some(port) => format!("master@{host}:{port}"),
        None => format!("master@{host}"),
    }
}

/// Returns the candidate that currently leads the cluster.
///
/// A single candidate is trusted without any request.
pub async fn resolve_leader(client: &HttpClient, candidates: &[Url]) -> Result<Url, LeaderError> {
    match candidates {
        [] => return Err(LeaderError::NoCandidates),
        [only] => return Ok(only.clone()),
        _ => {}
    }

    for candidate in candidates {
        let url = match endpoint(candidate, STATE_PATH) {
            Ok(url) => url,
            Err(e) => {
                warn!(candidate = %candidate, error = %e, "skipping candidate");
                continue;
            }
        };

        let state: ClusterState = match client.get_json(url).await {
            Ok(state) => state,
            Err(e) => {
                warn!(candidate = %candidate, error = %e, "failed to query candidate state");
                continue;
            }
        };

        if state.leader == advertised_identity(candidate) {
            debug!(leader = %candidate, "leader found");
            return Ok(candidate.clone());
        }
        debug!(candidate = %candidate, advertised = %state.leader, "candidate is not the leader");
    }

    Err(LeaderError::NoLeader(candidates.len()))
}
