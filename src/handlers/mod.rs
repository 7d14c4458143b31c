//! HTTP endpoint handlers for the exporter.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Landing page
//! - `/metrics`: Prometheus metrics endpoint
//! - `/sd`: Service discovery of agents
//! - `/health`: Health check endpoint

pub mod health;
pub mod metrics;
pub mod root;
pub mod sd;

// Re-export handlers
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;
pub use sd::sd_handler;
