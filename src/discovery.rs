//! File-based service discovery of agent nodes.
//!
//! Renders `[{"targets": ["<host>:<port>", ...], "labels": {...}}]` from the
//! master state so Prometheus can scrape a companion exporter on each agent.
//! The configured master is queried as-is, without leader resolution.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::Url;

use crate::cluster::ClusterState;
use crate::fetch::fetch_document;
use crate::leader::STATE_PATH;
use crate::transport::HttpClient;

/// Default port of the per-agent companion exporter.
pub const DEFAULT_SD_PORT: u16 = 8888;

/// Body returned when the cluster cannot be reached.
pub const UNREACHABLE: &str = "null";

/// One Prometheus file-SD target group.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetGroup {
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Settings for the discovery responder.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub master: Url,
    pub port: u16,
    pub labels: BTreeMap<String, String>,
}

impl Discovery {
    /// Builds the single target group for all agents in `state`.
    pub fn target_group(&self, state: &ClusterState) -> TargetGroup {
        let targets = state
            .slaves
            .iter()
            .filter(|agent| !agent.hostname.is_empty())
            .map(|agent| format!("{}:{}", agent.hostname, self.port))
            .collect();
        TargetGroup {
            targets,
            labels: self.labels.clone(),
        }
    }

    /// Fetches the master state and renders the discovery document.
    ///
    /// Returns the literal `null` when the master cannot be queried.
    pub async fn render(&self, client: &HttpClient) -> String {
        let state: ClusterState = match fetch_document(client, &self.master, STATE_PATH).await {
            Ok(state) => state,
            Err(e) => {
                warn!(master = %self.master, error = %e, "cannot get to cluster API");
                return UNREACHABLE.to_string();
            }
        };

        let groups = vec![self.target_group(&state)];
        debug!(targets = groups[0].targets.len(), "rendered service discovery");
        serde_json::to_string(&groups).unwrap_or_else(|e| {
            warn!(error = %e, "failed to serialize service discovery");
            UNREACHABLE.to_string()
        })
    }
}

/// Parses the discovery label set.
///
/// Accepts `key=value` pairs separated by commas, or a JSON object body such
/// as `"job":"cadvisor","env":"prod"` (braces optional). Unparseable entries
/// are logged and skipped.
pub fn parse_labels(input: &str) -> BTreeMap<String, String> {
    let input = input.trim();
    if input.starts_with('"') || input.starts_with('{') {
        let object = if input.starts_with('{') {
            input.to_string()
        } else {
            format!("{{{input}}}")
        };
        return serde_json::from_str(&object).unwrap_or_else(|e| {
            warn!(labels = input, error = %e, "ignoring malformed discovery labels");
            BTreeMap::new()
        });
    }

    input
        .split(',')
        .filter(|pair| !pair.trim().is_empty())
        .filter_map(|pair| {
            let parsed = pair
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
                .filter(|(key, _)| !key.is_empty());
            if parsed.is_none() {
                warn!(entry = pair, "ignoring discovery label without key=value");
            }
            parsed.map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovery() -> Discovery {
        Discovery {
            master: Url::parse("http://10.0.0.1:5050").unwrap(),
            port: 9100,
            labels: parse_labels("env=prod, team = infra"),
        }
    }

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels("env=prod, team = infra,broken,=x");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["env"], "prod");
        assert_eq!(labels["team"], "infra");
        assert!(parse_labels("").is_empty());
        assert!(parse_labels(" , ").is_empty());
    }

    #[test]
    fn test_parse_labels_json_fragment() {
        let labels = parse_labels(r#""job":"cadvisor", "env":"prod""#);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["job"], "cadvisor");
        assert_eq!(labels["env"], "prod");

        let labels = parse_labels(r#"{"job":"cadvisor"}"#);
        assert_eq!(labels["job"], "cadvisor");

        assert!(parse_labels(r#""job":"#).is_empty());
    }

    #[test]
    fn test_target_group_lists_every_agent() {
        let state: ClusterState = serde_json::from_str(
            r#"{"slaves": [{"hostname": "a1"}, {"hostname": "a2"}, {"id": "no-host"}]}"#,
        )
        .unwrap();

        let group = discovery().target_group(&state);
        assert_eq!(group.targets, vec!["a1:9100", "a2:9100"]);

        let json = serde_json::to_string(&vec![group]).unwrap();
        assert_eq!(
            json,
            r#"[{"targets":["a1:9100","a2:9100"],"labels":{"env":"prod","team":"infra"}}]"#
        );
    }

    #[test]
    fn test_no_agents_renders_empty_targets() {
        let group = discovery().target_group(&ClusterState::default());
        assert!(group.targets.is_empty());
    }
}
