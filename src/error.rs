//! Error types shared by the collection pipeline.
//!
//! Every recoverable failure during a scrape maps onto one of these types and
//! ends up as a single increment of the exporter error counter.

use reqwest::StatusCode;
use url::Url;

/// Failures of a single authenticated request against a cluster node.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] url::ParseError),

    #[error("redirect from {0} has no usable Location header")]
    MissingLocation(Url),

    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    #[error("{url} answered with HTTP {status}")]
    Status { url: Url, status: StatusCode },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

/// Leader discovery failures.
#[derive(Debug, thiserror::Error)]
pub enum LeaderError {
    #[error("no candidate is configured")]
    NoCandidates,

    #[error("unable to find leader among {0} candidates")]
    NoLeader(usize),
}

/// Result of a single extractor run that did not update its metric.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    /// A field the extractor needs is absent from the document.
    #[error("field '{0}' not found in document")]
    MissingField(String),

    #[error("{0}")]
    Invalid(String),
}

/// Strict-mode credential resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to read private key {path}: {source}")]
    ReadKey {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("private key is neither a file nor a valid secret: {0}")]
    DecodeSecret(#[source] serde_json::Error),

    #[error("private key is not a PKCS#1 or PKCS#8 RSA key")]
    ParseKey,

    #[error("failed to sign login token: {0}")]
    Sign(String),

    #[error("login failed: {0}")]
    Login(#[from] TransportError),

    #[error("login response carried an empty token")]
    EmptyToken,
}
