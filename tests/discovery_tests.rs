//! Integration tests for the agent service discovery document.

mod common;

use axum::{routing::get, Json, Router};
use herakles_mesos_exporter::discovery::{parse_labels, Discovery, UNREACHABLE};
use serde_json::{json, Value};

#[tokio::test]
async fn test_renders_one_group_with_every_agent() {
    let master = common::serve(Router::new().route(
        "/state",
        get(|| async {
            Json(json!({
                "leader": "master@10.0.0.1:5050",
                "slaves": [
                    {"id": "S1", "hostname": "agent-1.example"},
                    {"id": "S2", "hostname": "agent-2.example"}
                ]
            }))
        }),
    ))
    .await;

    let discovery = Discovery {
        master,
        port: 9100,
        labels: parse_labels("env=prod,dc=eu-1"),
    };
    let body = discovery.render(&common::client()).await;

    let groups: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        groups,
        json!([{
            "targets": ["agent-1.example:9100", "agent-2.example:9100"],
            "labels": {"dc": "eu-1", "env": "prod"}
        }])
    );
}

#[tokio::test]
async fn test_unreachable_master_renders_null() {
    let discovery = Discovery {
        master: common::dead_node(),
        port: 8888,
        labels: Default::default(),
    };
    assert_eq!(discovery.render(&common::client()).await, UNREACHABLE);
}

#[tokio::test]
async fn test_empty_cluster_renders_empty_targets() {
    let master = common::serve(Router::new().route("/state", get(|| async { Json(json!({})) }))).await;
    let discovery = Discovery {
        master,
        port: 8888,
        labels: Default::default(),
    };

    let body = discovery.render(&common::client()).await;
    assert_eq!(body, r#"[{"targets":[],"labels":{}}]"#);
}
