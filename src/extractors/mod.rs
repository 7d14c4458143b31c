//! Metric registrations for masters and agents.
//!
//! Each role exposes several sources (snapshot, state, monitor statistics),
//! and each source is a [`Pipeline`](crate::collector::Pipeline) of
//! `(metric, extractor)` pairs built from the helpers in this module.

pub mod agent;
pub mod master;

use prometheus::{CounterVec, Gauge, GaugeVec, Opts};
use serde_json::{Map, Value};

use crate::cluster::{attribute_value, Snapshot};
use crate::collector::Registration;
use crate::error::ExtractError;

pub use agent::agent_sources;
pub use master::master_sources;

/// Namespace shared by every exported metric.
pub const NAMESPACE: &str = "mesos";

/// Upstream reports memory and disk in megabytes.
pub const MEGABYTE: f64 = 1024.0 * 1024.0;

fn opts(subsystem: &str, name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(subsystem)
}

pub fn gauge(subsystem: &str, name: &str, help: &str) -> prometheus::Result<Gauge> {
    Gauge::with_opts(opts(subsystem, name, help))
}

pub fn gauge_vec(
    subsystem: &str,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    GaugeVec::new(opts(subsystem, name, help), labels)
}

pub fn counter_vec(
    subsystem: &str,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<CounterVec> {
    CounterVec::new(opts(subsystem, name, help), labels)
}

/// Turns a configured label name into a valid Prometheus label name.
pub fn sanitize_label(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sets a counter child to an absolute cumulative value.
pub(crate) fn set_counter(
    metric: &CounterVec,
    labels: &[&str],
    value: f64,
) -> Result<(), ExtractError> {
    if value.is_nan() || value < 0.0 {
        return Err(ExtractError::Invalid(format!(
            "counter {labels:?} cannot be set to {value}"
        )));
    }
    let counter = metric.with_label_values(labels);
    counter.reset();
    counter.inc_by(value);
    Ok(())
}

/// Gauge copied from one snapshot key.
pub(crate) fn snapshot_gauge(metric: Gauge, key: &'static str) -> Registration<Snapshot> {
    Registration::new(metric, move |snapshot: &Snapshot, metric: &Gauge| {
        metric.set(snapshot.get(key)?);
        Ok(())
    })
}

/// Gauge vec with one `label value -> snapshot key` entry per child.
///
/// All keys are read before any child is updated, so a missing key leaves the
/// metric untouched.
pub(crate) fn snapshot_gauge_vec(
    metric: GaugeVec,
    keys: &'static [(&'static str, &'static str)],
    scale: f64,
) -> Registration<Snapshot> {
    Registration::new(metric, move |snapshot: &Snapshot, metric: &GaugeVec| {
        let values = read_keys(snapshot, keys)?;
        for (label, value) in values {
            metric.with_label_values(&[label]).set(value * scale);
        }
        Ok(())
    })
}

/// Counter vec with one `label value -> snapshot key` entry per child.
pub(crate) fn snapshot_counter_vec(
    metric: CounterVec,
    keys: &'static [(&'static str, &'static str)],
) -> Registration<Snapshot> {
    Registration::new(metric, move |snapshot: &Snapshot, metric: &CounterVec| {
        let values = read_keys(snapshot, keys)?;
        for (label, value) in values {
            set_counter(metric, &[label], value)?;
        }
        Ok(())
    })
}

/// Total/used/free resource gauge, with `scale` applied to all three.
pub(crate) fn snapshot_resource(
    metric: GaugeVec,
    total_key: &'static str,
    used_key: &'static str,
    scale: f64,
) -> Registration<Snapshot> {
    Registration::new(metric, move |snapshot: &Snapshot, metric: &GaugeVec| {
        let total = snapshot.get(total_key)?;
        let used = snapshot.get(used_key)?;
        metric.with_label_values(&["total"]).set(total * scale);
        metric.with_label_values(&["used"]).set(used * scale);
        metric.with_label_values(&["free"]).set((total - used) * scale);
        Ok(())
    })
}

/// Label names for a fixed prefix followed by allow-listed keys.
pub(crate) fn label_names(fixed: &[&str], allowed: &[String]) -> Vec<String> {
    fixed
        .iter()
        .map(|name| name.to_string())
        .chain(allowed.iter().map(|name| sanitize_label(name)))
        .collect()
}

/// Values of allow-listed attributes, empty where an attribute is absent.
pub(crate) fn attribute_labels(allowed: &[String], attributes: &Map<String, Value>) -> Vec<String> {
    allowed
        .iter()
        .map(|key| attributes.get(key).map(attribute_value).unwrap_or_default())
        .collect()
}

fn read_keys(
    snapshot: &Snapshot,
    keys: &[(&'static str, &'static str)],
) -> Result<Vec<(&'static str, f64)>, ExtractError> {
    keys.iter()
        .map(|(label, key)| snapshot.get(key).map(|value| (*label, value)))
        .collect()
}
