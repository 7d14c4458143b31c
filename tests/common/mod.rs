//! Mock cluster nodes shared by the integration tests.

#![allow(dead_code)]

use axum::Router;
use herakles_mesos_exporter::{HttpClient, TlsOptions};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// Binds a listener on an ephemeral loopback port.
pub async fn bind() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("http://{}", addr)).unwrap();
    (listener, url)
}

/// Serves `router` on a listener obtained from [`bind`].
pub fn spawn(listener: TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

/// Binds and serves `router` in one step.
pub async fn serve(router: Router) -> Url {
    let (listener, url) = bind().await;
    spawn(listener, router);
    url
}

/// A loopback URL nothing listens on.
pub fn dead_node() -> Url {
    Url::parse("http://127.0.0.1:1").unwrap()
}

pub fn client() -> HttpClient {
    HttpClient::new(Duration::from_secs(2), &TlsOptions::default()).unwrap()
}

/// The `master@host:port` identity a node at `url` advertises.
pub fn identity(url: &Url) -> String {
    format!(
        "master@{}:{}",
        url.host_str().unwrap(),
        url.port_or_known_default().unwrap()
    )
}
