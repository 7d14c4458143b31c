//! Integration tests for credential signing across redirects and the
//! strict-mode login exchange.

mod common;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use herakles_mesos_exporter::auth::{resolve_credentials, AuthOptions};
use herakles_mesos_exporter::exporter::error_counter;
use herakles_mesos_exporter::transport::endpoint;
use herakles_mesos_exporter::{Credentials, TransportError};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

type Seen = Arc<Mutex<Vec<Option<String>>>>;

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Serves `/state` behind basic auth and records every Authorization header.
async fn protected_node(seen: Seen) -> url::Url {
    async fn state(State(seen): State<Seen>, headers: HeaderMap) -> Response {
        let auth = authorization(&headers);
        seen.lock().unwrap().push(auth.clone());
        match auth.as_deref() {
            Some("Basic ZXhwb3J0ZXI6czNjcmV0") => Json(json!({"leader": "master@x"})).into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
    common::serve(Router::new().route("/state", get(state)).with_state(seen)).await
}

/// Redirects every `/state` request to `target`, recording Authorization headers.
async fn redirecting_node(seen: Seen, target: String) -> url::Url {
    let router = Router::new()
        .route(
            "/state",
            get(
                |State((seen, target)): State<(Seen, String)>, headers: HeaderMap| async move {
                    seen.lock().unwrap().push(authorization(&headers));
                    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, target)])
                },
            ),
        )
        .with_state((seen, target));
    common::serve(router).await
}

#[tokio::test]
async fn test_basic_credentials_survive_cross_host_redirect() {
    let protected_seen = Seen::default();
    let protected = protected_node(protected_seen.clone()).await;
    // Same socket, different host name: a cross-host redirect for the client.
    let target = format!("http://localhost:{}/state", protected.port().unwrap());

    let redirect_seen = Seen::default();
    let entry = redirecting_node(redirect_seen.clone(), target).await;

    let client = common::client().with_credentials(Credentials::basic("exporter", "s3cret"));
    let state: Value = client
        .get_json(endpoint(&entry, "/state").unwrap())
        .await
        .unwrap();

    assert_eq!(state["leader"], "master@x");
    let expected = Some("Basic ZXhwb3J0ZXI6czNjcmV0".to_string());
    assert_eq!(*redirect_seen.lock().unwrap(), vec![expected.clone()]);
    assert_eq!(*protected_seen.lock().unwrap(), vec![expected]);
}

#[tokio::test]
async fn test_missing_credentials_surface_as_status_error() {
    let protected = protected_node(Seen::default()).await;
    let result: Result<Value, _> = common::client()
        .get_json(endpoint(&protected, "/state").unwrap())
        .await;
    assert!(matches!(
        result,
        Err(TransportError::Status { status, .. }) if status == StatusCode::UNAUTHORIZED
    ));
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let (listener, url) = common::bind().await;
    let target = endpoint(&url, "/state").unwrap().to_string();
    common::spawn(
        listener,
        Router::new()
            .route(
                "/state",
                get(|State(target): State<String>| async move {
                    (StatusCode::FOUND, [(header::LOCATION, target)])
                }),
            )
            .with_state(target),
    );

    let result: Result<Value, _> = common::client().get_json(endpoint(&url, "/state").unwrap()).await;
    assert!(matches!(result, Err(TransportError::TooManyRedirects(_))));
}

/// Login endpoint that accepts any well-formed RS256 token for `uid`.
async fn login_node(uid: &'static str) -> url::Url {
    let router = Router::new().route(
        "/acs/api/v1/auth/login",
        post(move |Json(body): Json<Value>| async move {
            let token = body["token"].as_str().unwrap_or_default();
            let header = token.split('.').next().unwrap_or_default();
            let header = base64::decode_config(header, base64::URL_SAFE_NO_PAD).unwrap_or_default();
            let header: Value = serde_json::from_slice(&header).unwrap_or_default();

            if body["uid"] == uid && header["alg"] == "RS256" && token.split('.').count() == 3 {
                Json(json!({"token": "session-token"})).into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }),
    );
    common::serve(router).await
}

fn strict_options(username: &str, login_url: String, private_key: String) -> AuthOptions {
    AuthOptions {
        strict_mode: true,
        username: username.to_string(),
        password: String::new(),
        login_url,
        private_key,
    }
}

#[tokio::test]
async fn test_strict_login_with_key_file() {
    let node = login_node("exporter").await;
    let login_url = endpoint(&node, "/acs/api/v1/auth/login").unwrap().to_string();
    let key = fixture("service-account-pkcs1.pem").to_string_lossy().to_string();
    let errors = error_counter().unwrap();

    let credentials = resolve_credentials(
        &common::client(),
        &strict_options("exporter", login_url, key),
        &errors,
    )
    .await;

    assert_eq!(credentials, Credentials::Token("session-token".to_string()));
    assert_eq!(errors.get(), 0);
}

#[tokio::test]
async fn test_strict_login_with_inline_secret() {
    let node = login_node("svc-exporter").await;
    let secret = json!({
        "uid": "svc-exporter",
        "login_endpoint": endpoint(&node, "/acs/api/v1/auth/login").unwrap().to_string(),
        "private_key": std::fs::read_to_string(fixture("service-account-pkcs8.pem")).unwrap(),
        "scheme": "RS256",
    })
    .to_string();
    let errors = error_counter().unwrap();

    // The secret's uid and login endpoint replace the configured ones.
    let credentials = resolve_credentials(
        &common::client(),
        &strict_options("ignored", "http://127.0.0.1:1/unused".to_string(), secret),
        &errors,
    )
    .await;

    assert_eq!(credentials, Credentials::Token("session-token".to_string()));
    assert_eq!(errors.get(), 0);
}

#[tokio::test]
async fn test_rejected_login_degrades_to_no_credentials() {
    let node = login_node("someone-else").await;
    let login_url = endpoint(&node, "/acs/api/v1/auth/login").unwrap().to_string();
    let key = fixture("service-account-pkcs1.pem").to_string_lossy().to_string();
    let errors = error_counter().unwrap();

    let credentials = resolve_credentials(
        &common::client(),
        &strict_options("exporter", login_url, key),
        &errors,
    )
    .await;

    assert_eq!(credentials, Credentials::None);
    assert_eq!(errors.get(), 1);
}

#[tokio::test]
async fn test_token_is_sent_on_requests() {
    let seen = Seen::default();
    let router = Router::new()
        .route(
            "/state",
            get(|State(seen): State<Seen>, headers: HeaderMap| async move {
                seen.lock().unwrap().push(authorization(&headers));
                Json(json!({}))
            }),
        )
        .with_state(seen.clone());
    let node = common::serve(router).await;

    let client = common::client().with_credentials(Credentials::Token("abc".to_string()));
    let _: Value = client.get_json(endpoint(&node, "/state").unwrap()).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![Some("token=abc".to_string())]);
}
