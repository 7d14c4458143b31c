//! herakles-mesos-exporter
//!
//! Prometheus exporter for Mesos masters and agents with tracing logging.
//! This is the main entry point that resolves configuration, authenticates
//! against the cluster and serves the HTTP endpoints.

mod cli;
mod config;
mod handlers;
mod health_stats;
mod state;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use herakles_mesos_exporter::auth::{resolve_credentials, AuthOptions};
use herakles_mesos_exporter::discovery::{Discovery, DEFAULT_SD_PORT};
use herakles_mesos_exporter::exporter::{error_counter, Exporter};
use herakles_mesos_exporter::extractors::{agent_sources, master_sources};
use herakles_mesos_exporter::leader::parse_candidates;
use herakles_mesos_exporter::{HttpClient, TlsOptions};
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, runtime::Handle, signal};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use cli::{Args, LogLevel};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_ADDR,
    DEFAULT_LOGIN_URL,
};
use handlers::{health_handler, metrics_handler, root_handler, sd_handler};
use health_stats::HealthStats;
use state::{AppState, Mode};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match args.log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", args.log_level);
    Ok(())
}

/// Authentication settings of the effective config.
fn auth_options(config: &Config) -> AuthOptions {
    AuthOptions {
        strict_mode: config.strict_mode.unwrap_or(false),
        username: config.username.clone().unwrap_or_default(),
        password: config.password.clone().unwrap_or_default(),
        login_url: config
            .login_url
            .clone()
            .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
        private_key: config.private_key.clone().unwrap_or_default(),
    }
}

/// Resolves once on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    let config = resolve_config(&args)?;

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&args)?;

    info!("Starting herakles-mesos-exporter");

    let (mode, upstream) = match (&config.master, &config.slave) {
        (Some(master), _) if !master.is_empty() => (Mode::Master, master.as_str()),
        (_, Some(slave)) => (Mode::Agent, slave.as_str()),
        _ => return Err("Either --master or --slave is required".into()),
    };
    let candidates = parse_candidates(upstream)?;

    let tls = TlsOptions {
        trusted_certs: config.trusted_certs.clone().unwrap_or_default(),
        skip_verify: config.skip_ssl_verify.unwrap_or(false),
    };
    let client = HttpClient::new(config.timeout()?, &tls)?;

    let errors = error_counter()?;
    let credentials = resolve_credentials(&client, &auth_options(&config), &errors).await;
    info!("Using {} credentials for {} requests", credentials.mode(), mode.as_str());
    let client = client.with_credentials(credentials);

    let task_labels = config.exported_task_labels.clone().unwrap_or_default();
    let attributes = config.exported_slave_attributes.clone().unwrap_or_default();
    let sources = match mode {
        Mode::Master => master_sources(&attributes)?,
        Mode::Agent => agent_sources(&task_labels, &attributes)?,
    };

    let exporter = Exporter::new(client.clone(), candidates.clone(), errors.clone(), Handle::current())
        .with_sources(sources);

    // Registration validates every metric descriptor once.
    let registry = Registry::new();
    if let Err(e) = registry.register(Box::new(exporter)) {
        error!("Failed to register collectors: {}", e);
        return Err(e.into());
    }
    debug!("Exporter registered for {} candidate(s)", candidates.len());

    let discovery = match mode {
        Mode::Master => candidates.first().map(|master| Discovery {
            master: master.clone(),
            port: config.sd_port.unwrap_or(DEFAULT_SD_PORT),
            labels: config.sd_labels.clone().unwrap_or_default(),
        }),
        Mode::Agent => None,
    };

    let addr: SocketAddr = config.addr.as_deref().unwrap_or(DEFAULT_ADDR).parse()?;
    let enable_tls = config.enable_tls.unwrap_or(false);
    let tls_paths = config.tls_cert_path.clone().zip(config.tls_key_path.clone());

    let state = Arc::new(AppState {
        registry,
        collector_errors: errors,
        mode,
        discovery,
        client,
        config: Arc::new(config),
        health_stats: Arc::new(HealthStats::new()),
        start_time: Instant::now(),
    });

    // Configure HTTP server routes
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/sd", get(sd_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    match tls_paths {
        Some((cert_path, key_path)) if enable_tls => {
            // The HTTP client and the server link different rustls backends.
            if tokio_rustls::rustls::crypto::aws_lc_rs::default_provider()
                .install_default()
                .is_err()
            {
                debug!("rustls crypto provider already installed");
            }

            info!("Loading TLS certificate from: {}", cert_path);
            info!("Loading TLS private key from: {}", key_path);

            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .map_err(|e| {
                    error!("Failed to load TLS configuration: {}", e);
                    e
                })?;

            info!("herakles-mesos-exporter listening on https://{}", addr);

            let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        error!("Server error: {}", e);
                        return Err(e.into());
                    }
                }
                _ = shutdown_signal() => {
                    info!("Shutdown signal received, exiting...");
                }
            }
        }
        _ => {
            let listener = TcpListener::bind(addr).await?;
            info!("herakles-mesos-exporter listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .map_err(|e| {
                    error!("Server error: {}", e);
                    e
                })?;
        }
    }

    info!("herakles-mesos-exporter stopped gracefully");
    Ok(())
}
