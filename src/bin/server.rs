//! vhost-user Server Binary
//!
//! Starts the emulator on a Unix socket.

use std::io::ErrorKind;
use std::path::Path;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use vhost_user_emu::config::DEFAULT_SOCKET_PATH;
use vhost_user_emu::network::shutdown_channel;
use vhost_user_emu::{Config, Server};

/// vhost-user control-plane emulator
#[derive(Parser, Debug)]
#[command(name = "vhost-user-server")]
#[command(about = "Minimal vhost-user server answering feature negotiation")]
#[command(version)]
struct Args {
    /// Unix socket path
    #[arg(default_value = DEFAULT_SOCKET_PATH)]
    socket_path: String,

    /// Pending-connection backlog
    #[arg(short, long, default_value = "5")]
    backlog: i32,

    /// Feature bitmask for GET_FEATURES (hex with 0x, or decimal)
    #[arg(short, long, value_parser = parse_bitmask)]
    features: Option<u64>,

    /// Bitmask for GET_PROTOCOL_FEATURES (hex with 0x, or decimal)
    #[arg(short, long, value_parser = parse_bitmask)]
    protocol_features: Option<u64>,

    /// Close connections idle for this long (milliseconds, 0 = never)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,
}

fn parse_bitmask(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid bitmask '{}': {}", s, e))
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vhost_user_emu=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("vhost-user-emu server v{}", vhost_user_emu::VERSION);

    let mut builder = Config::builder()
        .socket_path(&args.socket_path)
        .backlog(args.backlog)
        .read_timeout_ms(args.read_timeout_ms);
    if let Some(features) = args.features {
        builder = builder.features(features);
    }
    if let Some(features) = args.protocol_features {
        builder = builder.protocol_features(features);
    }
    let config = builder.build();

    // Ctrl+C and SIGTERM stop the accept loop, even one that has not started yet
    let (trigger, signal) = shutdown_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping listener...");
        trigger.fire();
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    remove_stale_socket(&config.socket_path);

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Simple vhost-user server listening on: {}", args.socket_path);
    tracing::info!("PID: {}", std::process::id());

    if let Err(e) = server.run(signal) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server shutting down");
}

/// Remove a socket file left behind by a previous run
fn remove_stale_socket(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed stale socket {}", path.display()),
        Err(ref e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
    }
}
