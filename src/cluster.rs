//! Typed views of the JSON documents served by cluster nodes.
//!
//! Only the fields the exporter reads are modelled; everything else in the
//! upstream payloads is ignored. Sections that are absent on one role (masters
//! have `slaves`, agents have `frameworks` with running tasks) default to empty.

use ahash::AHashMap as HashMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ExtractError;

/// Flat metrics snapshot keyed by metric path, e.g. `master/cpus_total`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Snapshot(pub HashMap<String, f64>);

impl Snapshot {
    pub fn get(&self, key: &str) -> Result<f64, ExtractError> {
        self.0
            .get(key)
            .copied()
            .ok_or_else(|| ExtractError::MissingField(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Snapshot(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Cluster state document from a master or agent `/state` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterState {
    /// Advertised leader, e.g. `master@10.0.0.1:5050`.
    #[serde(default)]
    pub leader: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub slaves: Vec<AgentInfo>,
    #[serde(default)]
    pub frameworks: Vec<Framework>,
    /// Attributes of the agent serving the document.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// One agent as listed in the master state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub used_resources: Resources,
    #[serde(default)]
    pub unreserved_resources: Resources,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Scalar resources; memory and disk are in megabytes.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct Resources {
    #[serde(default)]
    pub cpus: f64,
    #[serde(default)]
    pub mem: f64,
    #[serde(default)]
    pub disk: f64,
    #[serde(default)]
    pub gpus: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Framework {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub executors: Vec<Executor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Executor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Label {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// One record of an agent `/monitor/statistics` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorUsage {
    #[serde(default)]
    pub executor_id: String,
    #[serde(default)]
    pub executor_name: String,
    #[serde(default)]
    pub framework_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub statistics: ExecutorStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorStatistics {
    pub cpus_limit: Option<f64>,
    pub cpus_system_time_secs: Option<f64>,
    pub cpus_user_time_secs: Option<f64>,
    pub mem_limit_bytes: Option<f64>,
    pub mem_rss_bytes: Option<f64>,
}

/// Agent executor statistics as returned by `/monitor/statistics`.
pub type MonitorStatistics = Vec<ExecutorUsage>;

/// Renders an attribute value the way it appears in label values.
pub fn attribute_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Returns `field` or a missing-field error naming `name`.
pub fn required(field: Option<f64>, name: &str) -> Result<f64, ExtractError> {
    field.ok_or_else(|| ExtractError::MissingField(name.to_string()))
}
