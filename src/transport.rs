//! Authenticated HTTP transport for talking to cluster nodes.
//!
//! Redirects are followed here instead of inside reqwest. The built-in policy
//! strips the `Authorization` header whenever a redirect changes host, and
//! cluster nodes routinely redirect to a different advertised hostname of the
//! same service. Every hop is therefore signed by the same [`Credentials`].

use anyhow::Context;
use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::{redirect, Certificate, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// Maximum number of redirect hops followed for one request.
pub const MAX_REDIRECTS: usize = 10;

/// Resolved credential mode, attached to every outgoing request.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    /// Bearer token obtained through the strict-mode login.
    Token(String),
}

impl Credentials {
    /// Basic credentials, or `None` unless both parts are present.
    pub fn basic(username: &str, password: &str) -> Self {
        if username.is_empty() || password.is_empty() {
            return Credentials::None;
        }
        Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Signs a request. Called for the origin request and for every redirect hop.
    pub fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::None => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::Token(token) => request.header(AUTHORIZATION, format!("token={token}")),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Credentials::None => "none",
            Credentials::Basic { .. } => "basic",
            Credentials::Token(_) => "strict",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => f.write_str("None"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// TLS trust configuration for upstream connections.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// PEM files that replace the system trust roots when non-empty.
    pub trusted_certs: Vec<PathBuf>,
    /// Disables peer verification. Only meant for trusted internal networks.
    pub skip_verify: bool,
}

/// HTTP client bound to one credential mode.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    credentials: Credentials,
}

impl HttpClient {
    /// Builds a client whose connect and overall timeouts are both `timeout`.
    pub fn new(timeout: Duration, tls: &TlsOptions) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(tls.skip_verify);

        if !tls.trusted_certs.is_empty() {
            builder = builder.tls_built_in_root_certs(false);
            for path in &tls.trusted_certs {
                let pem = std::fs::read(path)
                    .with_context(|| format!("x509 certificate pool error: {}", path.display()))?;
                let cert = Certificate::from_pem(&pem)
                    .with_context(|| format!("error parsing .pem file {}", path.display()))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder.build().context("unable to build HTTP client")?;
        Ok(Self {
            client,
            credentials: Credentials::None,
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Issues a signed GET, following redirects with the same credentials.
    pub async fn get(&self, url: Url) -> Result<Response, TransportError> {
        let mut current = url;
        for _ in 0..=MAX_REDIRECTS {
            let request = self.credentials.sign(self.client.get(current.clone()));
            let response = request
                .send()
                .await
                .map_err(|source| TransportError::Request {
                    url: current.clone(),
                    source,
                })?;

            if !is_followed_redirect(response.status()) {
                return Ok(response);
            }

            let next = redirect_target(&current, &response)?;
            debug!(from = %current, to = %next, "following redirect");
            current = next;
        }
        Err(TransportError::TooManyRedirects(MAX_REDIRECTS))
    }

    /// GETs `url` and decodes a successful body as JSON.
    pub async fn get_json<D: DeserializeOwned>(&self, url: Url) -> Result<D, TransportError> {
        let response = self.get(url).await?;
        decode_json(response).await
    }

    /// Unauthenticated JSON POST, used for the strict-mode login exchange.
    pub async fn post_json<B, D>(&self, url: Url, body: &B) -> Result<D, TransportError>
    where
        B: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request { url, source })?;
        decode_json(response).await
    }
}

/// Joins a fixed endpoint path onto a node base URL, keeping any base path prefix.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, TransportError> {
    let raw = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(raw, e))
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn redirect_target(current: &Url, response: &Response) -> Result<Url, TransportError> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|location| current.join(location).ok())
        .ok_or_else(|| TransportError::MissingLocation(current.clone()))
}

async fn decode_json<D: DeserializeOwned>(response: Response) -> Result<D, TransportError> {
    let url = response.url().clone();
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status { url, status });
    }
    let body = response
        .bytes()
        .await
        .map_err(|source| TransportError::Request {
            url: url.clone(),
            source,
        })?;
    serde_json::from_slice(&body).map_err(|source| TransportError::Decode { url, source })
}
