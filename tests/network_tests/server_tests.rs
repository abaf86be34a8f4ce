//! Server Tests
//!
//! These tests verify:
//! - Listener lifecycle (bind, stop, socket file cleanup)
//! - Bind failures surface as configuration errors
//! - Concurrent clients are served independently
//! - Misbehaving clients do not disturb other connections

use std::io::Write;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;
use vhost_user_emu::dispatch::{DEFAULT_FEATURES, DEFAULT_PROTOCOL_FEATURES};
use vhost_user_emu::network::{shutdown_channel, Client};
use vhost_user_emu::protocol::{
    encode, read_message, write_message, Message, RequestCode, MESSAGE_SIZE,
};
use vhost_user_emu::{Config, Server, ServerHandle, VhostError};

fn start_server(dir: &TempDir) -> ServerHandle {
    let config = Config::builder()
        .socket_path(dir.path().join("vhost.sock"))
        .accept_poll_ms(10)
        .build();
    Server::start(config).unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_socket_file_is_a_socket() {
    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);

    let metadata = std::fs::metadata(server.socket_path()).unwrap();
    assert!(metadata.file_type().is_socket());
    assert!(server.is_running());
}

#[test]
fn test_stop_removes_socket_file() {
    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);
    let path = server.socket_path().to_path_buf();
    assert!(path.exists());

    server.stop().unwrap();

    assert!(!path.exists());
    assert!(!server.is_running());
    assert!(UnixStream::connect(&path).is_err());

    // Second stop is a no-op
    server.stop().unwrap();
}

#[test]
fn test_drop_stops_server() {
    let dir = TempDir::new().unwrap();
    let path = {
        let server = start_server(&dir);
        server.socket_path().to_path_buf()
    };
    assert!(!path.exists());
}

#[test]
fn test_run_with_external_shutdown_signal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.sock");
    let server = Server::bind(
        Config::builder()
            .socket_path(&path)
            .accept_poll_ms(10)
            .build(),
    )
    .unwrap();
    assert_eq!(server.socket_path(), path.as_path());

    let (trigger, signal) = shutdown_channel();
    let listener = thread::spawn(move || server.run(signal));

    let mut client = Client::connect(&path).unwrap();
    assert_eq!(client.get_features().unwrap(), DEFAULT_FEATURES);

    trigger.fire();
    listener.join().unwrap().unwrap();
    assert!(!path.exists());

    // The accepted connection outlives the listener
    assert_eq!(
        client.get_protocol_features().unwrap(),
        DEFAULT_PROTOCOL_FEATURES
    );
}

#[test]
fn test_bind_nonexistent_directory_is_config_error() {
    let config = Config::builder()
        .socket_path("/nonexistent/path/socket")
        .build();

    match Server::bind(config) {
        Err(VhostError::Config(msg)) => assert!(msg.contains("/nonexistent/path/socket")),
        Err(e) => panic!("Expected configuration error, got {}", e),
        Ok(_) => panic!("Expected configuration error, server started"),
    }
}

#[test]
fn test_bind_existing_path_is_config_error_and_keeps_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taken");
    std::fs::write(&path, b"not a socket").unwrap();

    let result = Server::bind(Config::builder().socket_path(&path).build());
    assert!(matches!(result, Err(VhostError::Config(_))));
    assert_eq!(std::fs::read(&path).unwrap(), b"not a socket");
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .socket_path(dir.path().join("a.sock"))
        .backlog(0)
        .build();
    assert!(matches!(Server::bind(config), Err(VhostError::Config(_))));

    let config = Config::builder().socket_path("").build();
    assert!(matches!(Server::start(config), Err(VhostError::Config(_))));
}

// =============================================================================
// Serving Clients
// =============================================================================

#[test]
fn test_sequential_connections() {
    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);

    for _ in 0..5 {
        let mut client = Client::connect(server.socket_path()).unwrap();
        assert_eq!(client.path(), server.socket_path());
        let handshake = client.handshake().unwrap();
        assert_eq!(handshake.features.payload.as_u64(), DEFAULT_FEATURES);
        assert_eq!(
            handshake.protocol_features.payload.as_u64(),
            DEFAULT_PROTOCOL_FEATURES
        );
    }
}

#[test]
fn test_concurrent_clients_get_independent_replies() {
    const CLIENTS: usize = 16;
    const ROUNDS: usize = 50;

    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);
    let path = server.socket_path().to_path_buf();
    let barrier = Arc::new(Barrier::new(CLIENTS));

    let workers: Vec<_> = (0..CLIENTS)
        .map(|i| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut client = Client::connect(&path).unwrap();
                barrier.wait();
                for round in 0..ROUNDS {
                    // Each client sends its own unknown code
                    let code = 1000 + (i * ROUNDS + round) as u32;
                    let reply = client.request(&Message::request(code)).unwrap();
                    assert_eq!(reply.request, code);
                    assert_eq!(reply.size, 8);
                    assert_eq!(reply.payload.as_u64(), 0);

                    assert_eq!(client.get_features().unwrap(), DEFAULT_FEATURES);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_malformed_client_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);

    let mut good = Client::connect(server.socket_path()).unwrap();
    assert_eq!(good.get_features().unwrap(), DEFAULT_FEATURES);

    // Half a message, then hang up
    let mut bad = UnixStream::connect(server.socket_path()).unwrap();
    let encoded = encode(&Message::request(RequestCode::GetFeatures)).unwrap();
    bad.write_all(&encoded[..MESSAGE_SIZE / 2]).unwrap();
    drop(bad);

    assert_eq!(
        good.get_protocol_features().unwrap(),
        DEFAULT_PROTOCOL_FEATURES
    );

    // New connections are still accepted
    let mut late = Client::connect(server.socket_path()).unwrap();
    assert_eq!(late.get_features().unwrap(), DEFAULT_FEATURES);
}

#[test]
fn test_client_that_leaves_without_reading() {
    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);

    for _ in 0..3 {
        let mut rude = UnixStream::connect(server.socket_path()).unwrap();
        write_message(&mut rude, &Message::request(RequestCode::GetFeatures)).unwrap();
        drop(rude);
    }

    let mut polite = UnixStream::connect(server.socket_path()).unwrap();
    write_message(&mut polite, &Message::request(RequestCode::GetFeatures)).unwrap();
    let reply = read_message(&mut polite).unwrap().unwrap();
    assert_eq!(reply.payload.as_u64(), DEFAULT_FEATURES);
    assert!(server.is_running());
}

#[test]
fn test_custom_features_are_advertised() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .socket_path(dir.path().join("custom.sock"))
        .features(0x1234_5678_ABCD_EF00)
        .protocol_features(0x0000_000F)
        .accept_poll_ms(10)
        .build();
    let server = Server::start(config).unwrap();

    let mut client = Client::connect(server.socket_path()).unwrap();
    assert_eq!(client.get_features().unwrap(), 0x1234_5678_ABCD_EF00);
    assert_eq!(client.get_protocol_features().unwrap(), 0xF);
    client.set_features(0x1234_5678_ABCD_EF00).unwrap();
    client.set_protocol_features(0x1).unwrap();
    client.set_owner().unwrap();
}

#[test]
fn test_connect_to_missing_socket_is_connect_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.sock");

    match Client::connect(&missing) {
        Err(VhostError::Connect(msg)) => assert!(msg.contains("missing.sock")),
        Err(e) => panic!("Expected connect error, got {}", e),
        Ok(_) => panic!("Expected connect error, connected"),
    }
    assert!(!missing.exists());
}

#[test]
fn test_trigger_from_handle_stops_listener() {
    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);
    let path = server.socket_path().to_path_buf();

    server.trigger().fire();
    server.stop().unwrap();

    assert!(!path.exists());
}

#[test]
fn test_peers_hanging_up_before_accept_do_not_stop_listener() {
    let dir = TempDir::new().unwrap();
    let server = start_server(&dir);

    // Queue up connections that are gone by the time they are accepted
    for _ in 0..20 {
        drop(UnixStream::connect(server.socket_path()).unwrap());
    }

    let mut client = Client::connect(server.socket_path()).unwrap();
    assert_eq!(client.get_features().unwrap(), DEFAULT_FEATURES);
    assert!(server.is_running());
}
