//! oscgate-gw - HTTP to OSC variable gateway
//!
//! Serves the CGI-style variable API and the JSON batch protocol over
//! HTTP, keeps the datapool as the shared source of truth, and mirrors
//! matching writes to the configured OSC host over UDP.

use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oscgate_common::config::{load_seed_file, GatewayConfig};
use oscgate_common::osc::{OscRoute, UdpTransport};
use oscgate_common::pool::{DataPool, PoolOptions, SystemFacts, SystemSpace};
use oscgate_gw::uservars::DemoVars;
use oscgate_gw::{build_router, AppState};

/// Command-line arguments for oscgate-gw
#[derive(Parser, Debug)]
#[command(name = "oscgate-gw")]
#[command(about = "HTTP to OSC variable gateway")]
#[command(version)]
struct Args {
    /// Path to the gateway configuration file
    #[arg(short, long, env = "OSCGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the HTTP listen port
    #[arg(short, long, env = "OSCGATE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oscgate_gw=debug,oscgate_common=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting OSC gateway (oscgate-gw) v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config =
        GatewayConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        "Routing \"{}...\" to OSC host {}:{}",
        config.osc_prefix, config.osc_host, config.osc_port
    );

    // Assemble the datapool: system facts, demo user variables, OSC route
    let facts = SystemFacts {
        app_name: env!("CARGO_PKG_NAME").to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        server_ip: discover_server_ip(),
        server_port: config.port,
        user_prefix: config.user_prefix.clone(),
        osc_host: config.osc_host.clone(),
        osc_port: config.osc_port,
        osc_prefix: config.osc_prefix.clone(),
    };
    let route = OscRoute::new(
        config.osc_prefix.clone(),
        Box::new(UdpTransport::new(config.osc_host.clone(), config.osc_port)),
    );
    let options = PoolOptions {
        user_prefix: config.user_prefix.clone(),
        on_the_fly_allocation: config.on_the_fly_allocation,
        ..PoolOptions::default()
    };
    let mut pool = DataPool::new(
        options,
        SystemSpace::new(&facts),
        Box::new(DemoVars::new()),
        Some(route),
    );

    let seed = match config.seed_file.as_deref() {
        Some(path) => match load_seed_file(path) {
            Ok(seed) => seed,
            Err(e) => {
                warn!("cannot load seed file {}: {e}", path.display());
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    let seeded = pool.init(&seed);
    info!("Datapool ready ({} seeded variables)", seeded);

    let pool = Arc::new(Mutex::new(pool));

    // Periodic refresh driver for the user-space accessors
    let refresh_pool = Arc::clone(&pool);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            refresh_pool.lock().unwrap().refresh();
        }
    });

    let state = AppState::new(Arc::clone(&pool), config.strict_pair_scan);
    let app = build_router(state, &config.web_root);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!("oscgate-gw listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.lock().unwrap().teardown();
    info!("Bye.");

    Ok(())
}

/// Resolve on SIGINT (ctrl-c) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Best-effort local address for the SERVER_IP status variable: the
/// source address of a routed (never sent) datagram, empty when the
/// host has no route.
fn discover_server_ip() -> String {
    let probe = || -> std::io::Result<String> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect(("8.8.8.8", 53))?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    probe().unwrap_or_default()
}
