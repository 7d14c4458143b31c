//! Master metrics: the leader's metrics snapshot and its view of agents.

use prometheus::GaugeVec;

use super::{
    attribute_labels, counter_vec, gauge, gauge_vec, label_names, snapshot_counter_vec,
    snapshot_gauge, snapshot_gauge_vec, snapshot_resource, MEGABYTE,
};
use crate::cluster::{ClusterState, Resources, Snapshot};
use crate::collector::{Pipeline, Registration, Source};
use crate::fetch::SNAPSHOT_PATH;
use crate::leader::STATE_PATH;

const TASKS_ACTIVE: &[(&str, &str)] = &[
    ("staging", "master/tasks_staging"),
    ("starting", "master/tasks_starting"),
    ("running", "master/tasks_running"),
    ("killing", "master/tasks_killing"),
];

const TASKS_TERMINAL: &[(&str, &str)] = &[
    ("error", "master/tasks_error"),
    ("failed", "master/tasks_failed"),
    ("finished", "master/tasks_finished"),
    ("killed", "master/tasks_killed"),
    ("lost", "master/tasks_lost"),
];

const SLAVES: &[(&str, &str)] = &[
    ("active", "master/slaves_active"),
    ("inactive", "master/slaves_inactive"),
    ("connected", "master/slaves_connected"),
    ("disconnected", "master/slaves_disconnected"),
];

const FRAMEWORKS: &[(&str, &str)] = &[
    ("active", "master/frameworks_active"),
    ("inactive", "master/frameworks_inactive"),
    ("connected", "master/frameworks_connected"),
    ("disconnected", "master/frameworks_disconnected"),
];

const EVENT_QUEUE: &[(&str, &str)] = &[
    ("message", "master/event_queue_messages"),
    ("dispatch", "master/event_queue_dispatches"),
    ("http_request", "master/event_queue_http_requests"),
];

/// All sources collected from a master.
pub fn master_sources(attributes: &[String]) -> prometheus::Result<Vec<Box<dyn Source>>> {
    Ok(vec![
        Box::new(snapshot_pipeline()?),
        Box::new(state_pipeline(attributes)?),
    ])
}

pub fn snapshot_pipeline() -> prometheus::Result<Pipeline<Snapshot>> {
    Ok(Pipeline::new(SNAPSHOT_PATH)
        .register(snapshot_resource(
            gauge_vec("master", "cpus", "Current CPU resources in cluster.", &["type"])?,
            "master/cpus_total",
            "master/cpus_used",
            1.0,
        ))
        .register(snapshot_resource(
            gauge_vec("master", "mem_bytes", "Current memory resources in cluster.", &["type"])?,
            "master/mem_total",
            "master/mem_used",
            MEGABYTE,
        ))
        .register(snapshot_resource(
            gauge_vec("master", "disk_bytes", "Current disk resources in cluster.", &["type"])?,
            "master/disk_total",
            "master/disk_used",
            MEGABYTE,
        ))
        .register(snapshot_resource(
            gauge_vec("master", "gpus", "Current GPU resources in cluster.", &["type"])?,
            "master/gpus_total",
            "master/gpus_used",
            1.0,
        ))
        .register(snapshot_gauge_vec(
            gauge_vec(
                "master",
                "task_states_current",
                "Current number of tasks by state.",
                &["state"],
            )?,
            TASKS_ACTIVE,
            1.0,
        ))
        .register(snapshot_counter_vec(
            counter_vec(
                "master",
                "task_states_exit_total",
                "Total number of tasks processed by exit state.",
                &["state"],
            )?,
            TASKS_TERMINAL,
        ))
        .register(snapshot_gauge_vec(
            gauge_vec(
                "master",
                "slaves_state",
                "Current number of slaves known to the master per connection and registration state.",
                &["state"],
            )?,
            SLAVES,
            1.0,
        ))
        .register(snapshot_gauge_vec(
            gauge_vec(
                "master",
                "frameworks_state",
                "Current number of frameworks known to the master per connection and registration state.",
                &["state"],
            )?,
            FRAMEWORKS,
            1.0,
        ))
        .register(snapshot_gauge_vec(
            gauge_vec(
                "master",
                "event_queue_length",
                "Current number of elements in event queue by type.",
                &["type"],
            )?,
            EVENT_QUEUE,
            1.0,
        ))
        .register(snapshot_gauge(
            gauge("master", "elected", "1 if master is elected leader, 0 if not")?,
            "master/elected",
        ))
        .register(snapshot_gauge(
            gauge("master", "uptime_seconds", "Number of seconds the master process is running.")?,
            "master/uptime_secs",
        )))
}

/// Per-agent resources and attributes from the master state.
pub fn state_pipeline(attributes: &[String]) -> prometheus::Result<Pipeline<ClusterState>> {
    let mut pipeline = Pipeline::new(STATE_PATH)
        .register(agent_resource(
            gauge_vec("master", "slave_cpus", "CPU resources of each agent.", &["slave", "type"])?,
            |r| r.cpus,
            1.0,
        ))
        .register(agent_resource(
            gauge_vec("master", "slave_mem_bytes", "Memory resources of each agent.", &["slave", "type"])?,
            |r| r.mem,
            MEGABYTE,
        ))
        .register(agent_resource(
            gauge_vec("master", "slave_disk_bytes", "Disk resources of each agent.", &["slave", "type"])?,
            |r| r.disk,
            MEGABYTE,
        ));

    if !attributes.is_empty() {
        pipeline = pipeline.register(agent_attributes(attributes)?);
    }
    Ok(pipeline)
}

fn agent_resource(
    metric: GaugeVec,
    select: fn(&Resources) -> f64,
    scale: f64,
) -> Registration<ClusterState> {
    Registration::new(metric, move |state: &ClusterState, metric: &GaugeVec| {
        metric.reset();
        for agent in &state.slaves {
            for (kind, resources) in [
                ("total", &agent.resources),
                ("used", &agent.used_resources),
                ("unreserved", &agent.unreserved_resources),
            ] {
                metric
                    .with_label_values(&[agent.id.as_str(), kind])
                    .set(select(resources) * scale);
            }
        }
        Ok(())
    })
}

fn agent_attributes(attributes: &[String]) -> prometheus::Result<Registration<ClusterState>> {
    let names = label_names(&["slave"], attributes);
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let metric = gauge_vec(
        "master",
        "slave_attributes",
        "Attributes of each agent known to the master.",
        &names,
    )?;

    let allowed = attributes.to_vec();
    Ok(Registration::new(
        metric,
        move |state: &ClusterState, metric: &GaugeVec| {
            metric.reset();
            for agent in &state.slaves {
                let mut values = vec![agent.id.clone()];
                values.extend(attribute_labels(&allowed, &agent.attributes));
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                metric.with_label_values(&values).set(1.0);
            }
            Ok(())
        },
    ))
}
