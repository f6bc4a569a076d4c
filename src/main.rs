//! Brickyard service binary
//!
//! Loads the configuration file, constructs the application context, and
//! serves the REST API until shutdown.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brickyard::{App, ApiServer, ApiServerConfig, Error, OpTracker, Result};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Brickyard - Storage Cluster Management Service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, env = "BRICKYARD_CONFIG", default_value = "brickyard.json")]
    config: String,

    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    api_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8081")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Brickyard storage cluster manager");
    info!("  Version: {}", brickyard::VERSION);
    info!("  Config: {}", args.config);
    info!("  REST API: {}", args.api_addr);

    let config_file = match std::fs::File::open(&args.config) {
        Ok(file) => file,
        Err(e) => {
            error!("Unable to open configuration file {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let app = match App::from_reader(config_file) {
        Ok(app) => app,
        Err(e) => {
            error!("Unable to load application: {}", e);
            std::process::exit(1);
        }
    };

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    let ops = app.ops().clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr, ops).await {
            error!("Metrics server error: {}", e);
        }
    });

    let api_config = ApiServerConfig {
        rest_addr: args
            .api_addr
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid REST API address: {}", e)))?,
        ..Default::default()
    };

    let server = ApiServer::new(api_config);
    server.run(app.router()).await?;

    app.close();
    info!("Service shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower=warn".parse().unwrap())
        .add_directive("axum=info".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, ops: Arc<OpTracker>) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    let pending_gauge = prometheus::register_gauge!(
        "brickyard_async_ops_pending",
        "Number of asynchronous operations still pending"
    )
    .map_err(|e| Error::Internal(format!("Unable to register metrics: {}", e)))?;

    let make_svc = make_service_fn(move |_conn| {
        let ops = ops.clone();
        let pending_gauge = pending_gauge.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let ops = ops.clone();
                let pending_gauge = pending_gauge.clone();
                async move {
                    let response = match req.uri().path() {
                        "/metrics" => {
                            pending_gauge.set(ops.pending_count() as f64);

                            let encoder = TextEncoder::new();
                            let metric_families = prometheus::gather();
                            let mut buffer = Vec::new();
                            encoder.encode(&metric_families, &mut buffer).unwrap();

                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", encoder.format_type())
                                .body(Body::from(buffer))
                                .unwrap()
                        }
                        _ => Response::builder()
                            .status(StatusCode::NOT_FOUND)
                            .body(Body::from("not found"))
                            .unwrap(),
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid metrics server address: {}", e)))?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
