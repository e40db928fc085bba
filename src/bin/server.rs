//! bucketkv Server Binary
//!
//! Starts the HTTP server for bucketkv.

use bucketkv::server::{self, AppState};
use bucketkv::{Config, Engine};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// bucketkv Server
#[derive(Parser, Debug)]
#[command(name = "bucketkv-server")]
#[command(about = "HTTP front-end for a bucketkv storage")]
#[command(version)]
struct Args {
    /// Storage directory
    #[arg(short, long, default_value = "./kvstorage")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:2310")]
    listen: String,

    /// Number of buckets
    #[arg(short, long, default_value = "16")]
    buckets: usize,

    /// Max buckets held in memory
    #[arg(short, long, default_value = "2")]
    cache: usize,
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bucketkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("bucketkv Server v{}", bucketkv::VERSION);
    tracing::info!("Storage directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .bucket_count(args.buckets)
        .max_cached_buckets(args.cache)
        .listen_addr(&args.listen)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let listener = match TcpListener::bind(&config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    // Start server, stopping on Ctrl+C
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
    };

    if let Err(e) = server::serve(listener, AppState::new(engine), shutdown).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
