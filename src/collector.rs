//! Extractor registry and the per-document collection cycle.
//!
//! A [`Pipeline`] owns an ordered list of `(metric, extractor)` registrations
//! for one upstream document. On every scrape the document is fetched once and
//! each extractor runs against it on its own: a failing extractor is logged and
//! counted, and only its metric is left out of the scrape.

use async_trait::async_trait;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::IntCounter;
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::error::ExtractError;
use crate::fetch::fetch_document;
use crate::transport::HttpClient;

type ExtractFn<D> = Box<dyn Fn(&D) -> Result<(), ExtractError> + Send + Sync>;

/// One metric and the function that updates it from a document.
pub struct Registration<D> {
    name: String,
    metric: Box<dyn Collector>,
    extract: ExtractFn<D>,
    // Held from extract to collect so a concurrent scrape cannot reset the metric in between.
    update: Mutex<()>,
}

impl<D> Registration<D> {
    pub fn new<M, F>(metric: M, extract: F) -> Self
    where
        M: Collector + Clone + 'static,
        F: Fn(&D, &M) -> Result<(), ExtractError> + Send + Sync + 'static,
    {
        let name = metric
            .desc()
            .first()
            .map(|desc| desc.fq_name.clone())
            .unwrap_or_default();
        let handle = metric.clone();
        Self {
            name,
            metric: Box::new(metric),
            extract: Box::new(move |doc| extract(doc, &handle)),
            update: Mutex::new(()),
        }
    }

    /// Fully qualified name of the metric this registration updates.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the extractor and, on success, returns the updated metric.
    pub fn run(&self, doc: &D) -> Result<Vec<MetricFamily>, ExtractError> {
        let _update = self.update.lock().unwrap_or_else(|e| e.into_inner());
        (self.extract)(doc)?;
        Ok(self.metric.collect())
    }
}

/// Registrations for one document served at `path` on the leader.
pub struct Pipeline<D> {
    path: &'static str,
    registrations: Vec<Registration<D>>,
}

impl<D> Pipeline<D> {
    pub fn new(path: &'static str) -> Self {
        Self {
            path,
            registrations: Vec::new(),
        }
    }

    pub fn register(mut self, registration: Registration<D>) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Applies every extractor in registration order.
    ///
    /// `errors` is incremented once per failed extractor.
    pub fn apply(&self, doc: &D, errors: &IntCounter) -> Vec<MetricFamily> {
        let mut families = Vec::new();
        for registration in &self.registrations {
            match registration.run(doc) {
                Ok(updated) => families.extend(updated),
                Err(ExtractError::MissingField(field)) => {
                    warn!(
                        metric = registration.name(),
                        field = %field,
                        "couldn't find fields required to update metric"
                    );
                    errors.inc();
                }
                Err(e) => {
                    warn!(metric = registration.name(), error = %e, "extractor failed");
                    errors.inc();
                }
            }
        }
        families
    }
}

/// A document-backed group of metrics collected against the leader.
#[async_trait]
pub trait Source: Send + Sync {
    fn path(&self) -> &str;

    fn descs(&self) -> Vec<&Desc>;

    /// Fetches the document from `leader` and runs all extractors.
    ///
    /// A failed fetch yields no metrics and a single increment of `errors`.
    async fn collect(
        &self,
        client: &HttpClient,
        leader: &Url,
        errors: &IntCounter,
    ) -> Vec<MetricFamily>;
}

#[async_trait]
impl<D> Source for Pipeline<D>
where
    D: DeserializeOwned + Send + Sync + 'static,
{
    fn path(&self) -> &str {
        self.path
    }

    fn descs(&self) -> Vec<&Desc> {
        self.registrations
            .iter()
            .flat_map(|r| r.metric.desc())
            .collect()
    }

    async fn collect(
        &self,
        client: &HttpClient,
        leader: &Url,
        errors: &IntCounter,
    ) -> Vec<MetricFamily> {
        match fetch_document::<D>(client, leader, self.path).await {
            Ok(doc) => {
                let families = self.apply(&doc, errors);
                debug!(
                    path = self.path,
                    updated = families.len(),
                    registered = self.registrations.len(),
                    "document collected"
                );
                families
            }
            Err(e) => {
                warn!(path = self.path, error = %e, "failed to fetch document");
                errors.inc();
                Vec::new()
            }
        }
    }
}
