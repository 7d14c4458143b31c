//! Landing page served on `/`.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::handlers::health::{format_uptime, FOOTER_TEXT};
use crate::state::{Mode, SharedState};

const ENDPOINTS: [(&str, &str); 3] = [
    ("/metrics", "Cluster metrics, collected from the current leader on every scrape"),
    ("/sd", "File service discovery target group listing every agent (master mode)"),
    ("/health", "Scrape statistics and internal error count"),
];

/// Renders the landing page for a running exporter.
pub fn render_page(mode: Mode, upstream: &str, uptime_seconds: u64) -> String {
    let endpoints: String = ENDPOINTS
        .iter()
        .map(|(path, desc)| format!("<dt><a href=\"{path}\">{path}</a></dt><dd>{desc}</dd>\n"))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Herakles Mesos Exporter</title>
<style>
body {{ font-family: sans-serif; max-width: 48em; margin: 2em auto; color: #222; }}
dt {{ margin-top: 0.8em; font-family: monospace; }}
dd {{ margin-left: 1.5em; color: #555; }}
footer {{ margin-top: 3em; font-size: 0.85em; color: #777; }}
</style>
</head>
<body>
<h1>Herakles Mesos Exporter</h1>
<p>Version {version} in <b>{mode}</b> mode, upstream <code>{upstream}</code>, up {uptime}.</p>
<dl>
{endpoints}</dl>
<footer>{footer}</footer>
</body>
</html>"#,
        version = env!("CARGO_PKG_VERSION"),
        mode = mode.as_str(),
        upstream = upstream,
        uptime = format_uptime(uptime_seconds),
        endpoints = endpoints,
        footer = FOOTER_TEXT,
    )
}

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.health_stats.record_http_request();

    let upstream = match state.mode {
        Mode::Master => state.config.master.as_deref().unwrap_or_default(),
        Mode::Agent => state.config.slave.as_deref().unwrap_or_default(),
    };

    Html(render_page(
        state.mode,
        upstream,
        state.start_time.elapsed().as_secs(),
    ))
}
