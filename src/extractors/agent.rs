//! Agent metrics: snapshot, running tasks and per-executor usage.

use prometheus::{CounterVec, GaugeVec};

use super::{
    attribute_labels, counter_vec, gauge, gauge_vec, label_names, set_counter,
    snapshot_counter_vec, snapshot_gauge, snapshot_gauge_vec, snapshot_resource, MEGABYTE,
};
use crate::cluster::{required, ClusterState, ExecutorStatistics, MonitorStatistics, Snapshot};
use crate::collector::{Pipeline, Registration, Source};
use crate::error::ExtractError;
use crate::fetch::{MONITOR_PATH, SNAPSHOT_PATH};
use crate::leader::STATE_PATH;

const TASKS_ACTIVE: &[(&str, &str)] = &[
    ("staging", "slave/tasks_staging"),
    ("starting", "slave/tasks_starting"),
    ("running", "slave/tasks_running"),
    ("killing", "slave/tasks_killing"),
];

const TASKS_TERMINAL: &[(&str, &str)] = &[
    ("failed", "slave/tasks_failed"),
    ("finished", "slave/tasks_finished"),
    ("killed", "slave/tasks_killed"),
    ("lost", "slave/tasks_lost"),
];

const EXECUTORS: &[(&str, &str)] = &[
    ("registering", "slave/executors_registering"),
    ("running", "slave/executors_running"),
    ("terminating", "slave/executors_terminating"),
];

const EXECUTOR_LABELS: &[&str] = &["source", "framework_id", "executor_id"];

/// All sources collected from an agent.
pub fn agent_sources(
    task_labels: &[String],
    attributes: &[String],
) -> prometheus::Result<Vec<Box<dyn Source>>> {
    Ok(vec![
        Box::new(snapshot_pipeline()?),
        Box::new(state_pipeline(task_labels, attributes)?),
        Box::new(monitor_pipeline()?),
    ])
}

pub fn snapshot_pipeline() -> prometheus::Result<Pipeline<Snapshot>> {
    Ok(Pipeline::new(SNAPSHOT_PATH)
        .register(snapshot_resource(
            gauge_vec("slave", "cpus", "Current number of CPUs on this agent.", &["type"])?,
            "slave/cpus_total",
            "slave/cpus_used",
            1.0,
        ))
        .register(snapshot_resource(
            gauge_vec("slave", "mem_bytes", "Current memory on this agent.", &["type"])?,
            "slave/mem_total",
            "slave/mem_used",
            MEGABYTE,
        ))
        .register(snapshot_resource(
            gauge_vec("slave", "disk_bytes", "Current disk space on this agent.", &["type"])?,
            "slave/disk_total",
            "slave/disk_used",
            MEGABYTE,
        ))
        .register(snapshot_resource(
            gauge_vec("slave", "gpus", "Current number of GPUs on this agent.", &["type"])?,
            "slave/gpus_total",
            "slave/gpus_used",
            1.0,
        ))
        .register(snapshot_gauge_vec(
            gauge_vec(
                "slave",
                "task_states_current",
                "Current number of tasks by state.",
                &["state"],
            )?,
            TASKS_ACTIVE,
            1.0,
        ))
        .register(snapshot_counter_vec(
            counter_vec(
                "slave",
                "task_states_exit_total",
                "Total number of tasks processed by exit state.",
                &["state"],
            )?,
            TASKS_TERMINAL,
        ))
        .register(snapshot_gauge_vec(
            gauge_vec(
                "slave",
                "executor_state",
                "Current number of executors by state.",
                &["state"],
            )?,
            EXECUTORS,
            1.0,
        ))
        .register(snapshot_gauge(
            gauge("slave", "registered", "1 if agent is registered with the master, 0 if not")?,
            "slave/registered",
        ))
        .register(snapshot_gauge(
            gauge("slave", "uptime_seconds", "Number of seconds the agent process is running.")?,
            "slave/uptime_secs",
        )))
}

/// Running tasks with allow-listed labels, plus allow-listed agent attributes.
pub fn state_pipeline(
    task_labels: &[String],
    attributes: &[String],
) -> prometheus::Result<Pipeline<ClusterState>> {
    let mut pipeline = Pipeline::new(STATE_PATH).register(tasks(task_labels)?);
    if !attributes.is_empty() {
        pipeline = pipeline.register(agent_attributes(attributes)?);
    }
    Ok(pipeline)
}

fn tasks(allowed: &[String]) -> prometheus::Result<Registration<ClusterState>> {
    let names = label_names(
        &["source", "framework_id", "executor_id", "task_id", "task_name"],
        allowed,
    );
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let metric = gauge_vec(
        "slave",
        "task_labels",
        "Labels of tasks running on this agent.",
        &names,
    )?;

    let allowed = allowed.to_vec();
    Ok(Registration::new(
        metric,
        move |state: &ClusterState, metric: &GaugeVec| {
            metric.reset();
            for framework in &state.frameworks {
                for executor in &framework.executors {
                    for task in &executor.tasks {
                        let mut values = vec![
                            executor.source.clone(),
                            framework.id.clone(),
                            executor.id.clone(),
                            task.id.clone(),
                            task.name.clone(),
                        ];
                        values.extend(allowed.iter().map(|key| {
                            task.labels
                                .iter()
                                .find(|label| &label.key == key)
                                .map(|label| label.value.clone())
                                .unwrap_or_default()
                        }));
                        let values: Vec<&str> = values.iter().map(String::as_str).collect();
                        metric.with_label_values(&values).set(1.0);
                    }
                }
            }
            Ok(())
        },
    ))
}

fn agent_attributes(attributes: &[String]) -> prometheus::Result<Registration<ClusterState>> {
    let names = label_names(&[], attributes);
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let metric = gauge_vec("slave", "attributes", "Attributes of this agent.", &names)?;

    let allowed = attributes.to_vec();
    Ok(Registration::new(
        metric,
        move |state: &ClusterState, metric: &GaugeVec| {
            let values = attribute_labels(&allowed, &state.attributes);
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            metric.reset();
            metric.with_label_values(&values).set(1.0);
            Ok(())
        },
    ))
}

/// Per-executor resource usage from `/monitor/statistics`.
pub fn monitor_pipeline() -> prometheus::Result<Pipeline<MonitorStatistics>> {
    Ok(Pipeline::new(MONITOR_PATH)
        .register(executor_gauge(
            gauge_vec("slave", "executor_cpus_limit", "CPU share limit of each executor.", EXECUTOR_LABELS)?,
            "cpus_limit",
            |s| s.cpus_limit,
        ))
        .register(executor_counter(
            counter_vec(
                "slave",
                "executor_cpus_user_seconds_total",
                "Total user CPU time consumed by each executor.",
                EXECUTOR_LABELS,
            )?,
            "cpus_user_time_secs",
            |s| s.cpus_user_time_secs,
        ))
        .register(executor_counter(
            counter_vec(
                "slave",
                "executor_cpus_system_seconds_total",
                "Total system CPU time consumed by each executor.",
                EXECUTOR_LABELS,
            )?,
            "cpus_system_time_secs",
            |s| s.cpus_system_time_secs,
        ))
        .register(executor_gauge(
            gauge_vec("slave", "executor_mem_rss_bytes", "Resident memory of each executor.", EXECUTOR_LABELS)?,
            "mem_rss_bytes",
            |s| s.mem_rss_bytes,
        ))
        .register(executor_gauge(
            gauge_vec("slave", "executor_mem_limit_bytes", "Memory limit of each executor.", EXECUTOR_LABELS)?,
            "mem_limit_bytes",
            |s| s.mem_limit_bytes,
        )))
}

type Selector = fn(&ExecutorStatistics) -> Option<f64>;

/// Reads one statistic of every executor, failing if any executor lacks it.
fn executor_values<'a>(
    usage: &'a MonitorStatistics,
    field: &str,
    select: Selector,
) -> Result<Vec<([&'a str; 3], f64)>, ExtractError> {
    usage
        .iter()
        .map(|executor| {
            let value = required(select(&executor.statistics), field)?;
            let labels = [
                executor.source.as_str(),
                executor.framework_id.as_str(),
                executor.executor_id.as_str(),
            ];
            Ok((labels, value))
        })
        .collect()
}

fn executor_gauge(
    metric: GaugeVec,
    field: &'static str,
    select: Selector,
) -> Registration<MonitorStatistics> {
    Registration::new(metric, move |usage: &MonitorStatistics, metric: &GaugeVec| {
        let values = executor_values(usage, field, select)?;
        metric.reset();
        for (labels, value) in values {
            metric.with_label_values(&labels).set(value);
        }
        Ok(())
    })
}

fn executor_counter(
    metric: CounterVec,
    field: &'static str,
    select: Selector,
) -> Registration<MonitorStatistics> {
    Registration::new(metric, move |usage: &MonitorStatistics, metric: &CounterVec| {
        let values = executor_values(usage, field, select)?;
        metric.reset();
        for (labels, value) in values {
            set_counter(metric, &labels, value)?;
        }
        Ok(())
    })
}
