//! vhost-user Client Binary
//!
//! Connects to a vhost-user server and runs the feature handshake.
//!
//! Exit status: 0 on success, 1 if the server cannot be reached, 2 if a
//! reply is partial or malformed, 3 on any other transport failure.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use vhost_user_emu::network::DEFAULT_CLIENT_SOCKET_PATH;
use vhost_user_emu::{Client, VhostError};

/// vhost-user handshake client
#[derive(Parser, Debug)]
#[command(name = "vhost-user-client")]
#[command(about = "Send GET_FEATURES and GET_PROTOCOL_FEATURES to a vhost-user server")]
#[command(version)]
struct Args {
    /// Unix socket path
    #[arg(default_value = DEFAULT_CLIENT_SOCKET_PATH)]
    socket_path: String,

    /// Reply timeout in milliseconds (0 = wait forever)
    #[arg(short, long, default_value = "0")]
    timeout_ms: u64,
}

fn exit_code(err: &VhostError) -> i32 {
    match err {
        VhostError::Connect(_) => 1,
        e if e.is_malformed_reply() => 2,
        _ => 3,
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    println!("Connecting to vhost-user server at: {}", args.socket_path);

    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        std::process::exit(exit_code(&e));
    }

    println!("Client completed successfully");
}

fn run(args: &Args) -> vhost_user_emu::Result<()> {
    let mut client = Client::connect(&args.socket_path)?;
    client.set_timeouts(args.timeout_ms, args.timeout_ms)?;
    println!("Connected successfully");

    let handshake = client.handshake()?;

    let reply = handshake.features;
    println!(
        "Received reply: request={}, flags={:#x}, size={}, features={:#x}",
        reply.request,
        reply.flags,
        reply.size,
        reply.payload.as_u64()
    );

    let reply = handshake.protocol_features;
    println!(
        "Received protocol features: request={}, flags={:#x}, size={}, features={:#x}",
        reply.request,
        reply.flags,
        reply.size,
        reply.payload.as_u64()
    );

    Ok(())
}
