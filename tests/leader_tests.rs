//! Integration tests for leader resolution against mock masters.

mod common;

use axum::{routing::get, Json, Router};
use herakles_mesos_exporter::leader::resolve_leader;
use herakles_mesos_exporter::LeaderError;
use serde_json::json;
use url::Url;

/// A master whose `/state` advertises `leader`.
fn master(leader: String) -> Router {
    Router::new().route(
        "/state",
        get(move || {
            let leader = leader.clone();
            async move { Json(json!({ "leader": leader, "hostname": "m" })) }
        }),
    )
}

#[tokio::test]
async fn test_single_candidate_is_trusted_without_request() {
    let candidate = Url::parse("http://10.255.255.1:5050").unwrap();
    let leader = resolve_leader(&common::client(), &[candidate.clone()])
        .await
        .unwrap();
    assert_eq!(leader, candidate);
}

#[tokio::test]
async fn test_no_candidates() {
    let result = resolve_leader(&common::client(), &[]).await;
    assert!(matches!(result, Err(LeaderError::NoCandidates)));
}

#[tokio::test]
async fn test_follower_points_at_self_confirming_leader() {
    let (follower_listener, follower) = common::bind().await;
    let (leader_listener, leader) = common::bind().await;

    common::spawn(follower_listener, master(common::identity(&leader)));
    common::spawn(leader_listener, master(common::identity(&leader)));

    let resolved = resolve_leader(&common::client(), &[follower, leader.clone()])
        .await
        .unwrap();
    assert_eq!(resolved, leader);
}

#[tokio::test]
async fn test_unreachable_candidate_is_skipped() {
    let (listener, leader) = common::bind().await;
    common::spawn(listener, master(common::identity(&leader)));

    let resolved = resolve_leader(&common::client(), &[common::dead_node(), leader.clone()])
        .await
        .unwrap();
    assert_eq!(resolved, leader);
}

#[tokio::test]
async fn test_no_candidate_confirms_itself() {
    let a = common::serve(master("master@10.9.9.9:5050".to_string())).await;
    let b = common::serve(master(String::new())).await;

    let result = resolve_leader(&common::client(), &[a, b]).await;
    assert!(matches!(result, Err(LeaderError::NoLeader(2))));
}

#[tokio::test]
async fn test_invalid_state_document_is_skipped() {
    let broken = common::serve(Router::new().route("/state", get(|| async { "not json" }))).await;
    let (listener, leader) = common::bind().await;
    common::spawn(listener, master(common::identity(&leader)));

    let resolved = resolve_leader(&common::client(), &[broken, leader.clone()])
        .await
        .unwrap();
    assert_eq!(resolved, leader);
}
