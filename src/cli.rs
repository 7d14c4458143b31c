//! CLI arguments for herakles-mesos-exporter.
//!
//! This module defines the command-line interface structure using the clap library.
//! Credentials and discovery settings fall back to environment variables.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogLevel {
    Off,
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug, Default)]
#[command(
    name = "herakles-mesos-exporter",
    about = "Prometheus exporter for Mesos masters and agents",
    long_about = "Prometheus exporter for Mesos masters and agents.\n\n\
                  Polls the leading master (or a single agent) on every scrape, converts its \
                  metrics snapshot and state into Prometheus metrics and serves a service \
                  discovery feed of live agents.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version,
    after_help = "Project: https://github.com/cansp-dev/herakles-mesos-exporter — More info: https://www.herakles.now — Support: exporter@herakles.now"
)]
pub struct Args {
    /// Address to listen on
    #[arg(long)]
    pub addr: Option<String>,

    /// Expose metrics from the master(s) at this URL (comma-separated for HA)
    #[arg(long)]
    pub master: Option<String>,

    /// Expose metrics from the agent at this URL
    #[arg(long, alias = "agent")]
    pub slave: Option<String>,

    /// Polling timeout, used as connect and request timeout (e.g. 10s)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Comma-separated list of task labels to include in the corresponding metric
    #[arg(long)]
    pub exported_task_labels: Option<String>,

    /// Comma-separated list of slave attributes to include in the corresponding metric
    #[arg(long)]
    pub exported_slave_attributes: Option<String>,

    /// Comma-separated list of certificates (.pem files) trusted for requests to Mesos endpoints
    #[arg(long)]
    pub trusted_certs: Option<String>,

    /// Use strict mode authentication
    #[arg(long)]
    pub strict_mode: bool,

    /// Username for authentication
    #[arg(long, env = "MESOS_EXPORTER_USERNAME")]
    pub username: Option<String>,

    /// Password for authentication
    #[arg(long, env = "MESOS_EXPORTER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// URL for strict mode authentication
    #[arg(long)]
    pub login_url: Option<String>,

    /// Private key for strict mode authentication: a file path or an inline secret
    #[arg(long, env = "MESOS_EXPORTER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Skip SSL certificate verification
    #[arg(long)]
    pub skip_ssl_verify: bool,

    /// Port of the per-agent exporter advertised on /sd
    #[arg(long, env = "CADVISOR_PORT")]
    pub sd_port: Option<u16>,

    /// Labels attached to the /sd target group (key=value list or "key":"value" JSON pairs)
    #[arg(long, env = "LABELS")]
    pub sd_labels: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "error")]
    pub log_level: LogLevel,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}
