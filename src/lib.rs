//! Herakles Mesos Exporter Library
//!
//! This library implements the scrape-time collection pipeline of the
//! exporter. It is independent of the HTTP surface so it can be embedded and
//! tested on its own.
//!
//! # Pipeline
//!
//! - **Transport** ([`transport`], [`auth`]): TLS trust, credential modes and
//!   redirect-safe request signing
//! - **Leader discovery** ([`leader`]): picks the self-confirmed leader among
//!   configured coordinators
//! - **Fetch** ([`fetch`], [`cluster`]): typed upstream documents
//! - **Collection** ([`collector`], [`extractors`], [`exporter`]): per-extractor
//!   failure isolation and a process-wide error counter
//! - **Service discovery** ([`discovery`]): agent target groups
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_mesos_exporter::exporter::{error_counter, Exporter};
//! use herakles_mesos_exporter::extractors::master_sources;
//! use herakles_mesos_exporter::leader::parse_candidates;
//! use herakles_mesos_exporter::transport::{HttpClient, TlsOptions};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(Duration::from_secs(10), &TlsOptions::default())?;
//! let candidates = parse_candidates("http://10.0.0.1:5050,http://10.0.0.2:5050")?;
//! let exporter = Exporter::new(
//!     client,
//!     candidates,
//!     error_counter()?,
//!     tokio::runtime::Handle::current(),
//! )
//! .with_sources(master_sources(&[])?);
//!
//! let families = exporter.scrape().await;
//! println!("collected {} metric families", families.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cluster;
pub mod collector;
pub mod discovery;
pub mod error;
pub mod exporter;
pub mod extractors;
pub mod fetch;
pub mod leader;
pub mod transport;

// Re-export main types for convenience
pub use error::{AuthError, ExtractError, LeaderError, TransportError};
pub use exporter::Exporter;
pub use transport::{Credentials, HttpClient, TlsOptions};
