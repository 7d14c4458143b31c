//! Scrape-time assembly of leader discovery and document sources.
//!
//! [`Exporter`] is a regular `prometheus` collector. Registering it validates
//! every metric descriptor once at startup; gathering the registry runs one
//! scrape cycle. `Collector::collect` blocks on the runtime handle, so the
//! registry must be gathered from a blocking thread
//! (`tokio::task::spawn_blocking`), never from an async worker.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{IntCounter, Opts};
use tokio::runtime::Handle;
use tracing::{debug, error};
use url::Url;

use crate::collector::Source;
use crate::leader::resolve_leader;
use crate::transport::HttpClient;

/// Creates the process-wide internal error counter.
pub fn error_counter() -> prometheus::Result<IntCounter> {
    IntCounter::with_opts(
        Opts::new("errors_total", "Total number of internal mesos-collector errors.")
            .namespace("mesos")
            .subsystem("collector"),
    )
}

/// Collects all configured sources from the current leader.
pub struct Exporter {
    client: HttpClient,
    candidates: Vec<Url>,
    sources: Vec<Box<dyn Source>>,
    errors: IntCounter,
    runtime: Handle,
}

impl Exporter {
    pub fn new(
        client: HttpClient,
        candidates: Vec<Url>,
        errors: IntCounter,
        runtime: Handle,
    ) -> Self {
        Self {
            client,
            candidates,
            sources: Vec::new(),
            errors,
            runtime,
        }
    }

    pub fn with_sources(mut self, sources: Vec<Box<dyn Source>>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn errors(&self) -> &IntCounter {
        &self.errors
    }

    /// Runs one scrape cycle.
    ///
    /// A failed leader resolution yields no source metrics and one error. The
    /// error counter is always appended last so it includes this cycle.
    pub async fn scrape(&self) -> Vec<MetricFamily> {
        let mut families = Vec::new();

        match resolve_leader(&self.client, &self.candidates).await {
            Ok(leader) => {
                debug!(leader = %leader, sources = self.sources.len(), "starting scrape");
                for source in &self.sources {
                    families.extend(source.collect(&self.client, &leader, &self.errors).await);
                }
            }
            Err(e) => {
                error!(error = %e, "leader resolution failed");
                self.errors.inc();
            }
        }

        families.extend(self.errors.collect());
        families
    }
}

impl Collector for Exporter {
    fn desc(&self) -> Vec<&Desc> {
        self.sources
            .iter()
            .flat_map(|source| source.descs())
            .chain(self.errors.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.runtime.block_on(self.scrape())
    }
}
