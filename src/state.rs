//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use herakles_mesos_exporter::discovery::Discovery;
use herakles_mesos_exporter::HttpClient;
use prometheus::{IntCounter, Registry};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::health_stats::HealthStats;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Upstream role the exporter was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Master,
    Agent,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Master => "master",
            Mode::Agent => "agent",
        }
    }
}

/// Global application state shared across requests.
pub struct AppState {
    /// Registry holding the exporter; gathering it runs one scrape.
    pub registry: Registry,
    /// Handle on the exporter's internal error counter.
    pub collector_errors: IntCounter,
    pub mode: Mode,
    /// Service discovery settings, present in master mode only.
    pub discovery: Option<Discovery>,
    /// Authenticated client shared with the exporter.
    pub client: HttpClient,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
