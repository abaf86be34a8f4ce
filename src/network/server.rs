//! Unix Socket Server
//!
//! Accepts connections and hands each one to its own worker thread.

use std::fs;
use std::io::{self, ErrorKind};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::connection::Connection;
use super::shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Result, VhostError};

/// Listener for the emulator
///
/// Owns the listening socket and the socket file. Both are released when
/// the server is dropped, whichever way [`Server::run`] returns.
pub struct Server {
    listener: UnixListener,
    socket: SocketFile,
    config: Config,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind the configured socket path
    ///
    /// Fails with a configuration error if the path cannot be bound or
    /// listened on. A stale socket file is not removed here.
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let path = config.socket_path.clone();
        let listener = UnixListener::bind(&path).map_err(|e| {
            VhostError::Config(format!("cannot bind {}: {}", path.display(), e))
        })?;
        let socket = SocketFile { path };

        prepare_listener(&listener, config.backlog).map_err(|e| {
            VhostError::Config(format!(
                "cannot listen on {}: {}",
                socket.path.display(),
                e
            ))
        })?;

        tracing::info!(
            "Listening on {} (backlog {})",
            socket.path.display(),
            config.backlog
        );

        let dispatcher = Dispatcher::from_config(&config);
        Ok(Self {
            listener,
            socket,
            config,
            dispatcher,
        })
    }

    /// Bind and run the accept loop on a dedicated thread
    pub fn start(config: Config) -> Result<ServerHandle> {
        let server = Self::bind(config)?;
        let socket_path = server.socket_path().to_path_buf();
        let (trigger, signal) = shutdown_channel();

        let join = thread::Builder::new()
            .name("vhost-listener".to_string())
            .spawn(move || server.run(signal))?;

        Ok(ServerHandle {
            socket_path,
            trigger,
            listener: Mutex::new(Some(join)),
        })
    }

    /// Run the accept loop (blocking) until `shutdown` fires
    ///
    /// Interrupted and aborted accepts are retried; any other accept error
    /// stops the listener. Connections already handed to workers keep running.
    pub fn run(self, shutdown: ShutdownSignal) -> Result<()> {
        let poll_interval = Duration::from_millis(self.config.accept_poll_ms);
        let mut next_id: u64 = 0;

        loop {
            if shutdown.is_triggered() {
                break;
            }

            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    next_id += 1;
                    self.spawn_worker(stream, next_id);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    if shutdown.wait_timeout(poll_interval) {
                        break;
                    }
                }
                // A pending peer that hung up before we got to it
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted | ErrorKind::ConnectionAborted
                    ) =>
                {
                    continue
                }
                Err(e) => {
                    tracing::error!("Accept failed on {}: {}", self.socket.path.display(), e);
                    return Err(e.into());
                }
            }
        }

        tracing::info!(
            "Listener on {} shutting down after {} connections",
            self.socket.path.display(),
            next_id
        );
        Ok(())
    }

    /// Path of the bound socket
    pub fn socket_path(&self) -> &Path {
        &self.socket.path
    }

    fn spawn_worker(&self, stream: UnixStream, id: u64) {
        let dispatcher = self.dispatcher;
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name(format!("vhost-conn-{}", id))
            .spawn(move || serve_connection(stream, dispatcher, id, read_ms, write_ms));

        // The stream moved into the closure is closed on failure
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn worker for conn-{}: {}", id, e);
        }
    }
}

/// Worker body: runs one connection to completion and reports how it ended
fn serve_connection(
    stream: UnixStream,
    dispatcher: Dispatcher,
    id: u64,
    read_ms: u64,
    write_ms: u64,
) {
    let mut connection = match Connection::new(stream, dispatcher, id) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Failed to set up conn-{}: {}", id, e);
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!("Failed to configure {}: {}", connection.peer(), e);
        return;
    }

    match connection.handle() {
        Ok(reason) => {
            tracing::debug!("{} closed: {:?}", connection.peer(), reason);
        }
        Err(VhostError::Transport(ref e))
            if matches!(
                e.kind(),
                ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
            ) =>
        {
            tracing::debug!(
                "{} disconnected before the reply could be sent: {}",
                connection.peer(),
                e
            );
        }
        Err(e) => {
            tracing::warn!("{} closed with error: {}", connection.peer(), e);
        }
    }
}

/// Set the pending-connection queue depth and switch to non-blocking accepts
///
/// std binds with its own default backlog; calling listen(2) again on a
/// listening socket only updates the queue depth. The accept loop polls so
/// it can notice shutdown between accepts.
fn prepare_listener(listener: &UnixListener, backlog: i32) -> io::Result<()> {
    // SAFETY: the fd is owned by `listener` and stays open for the call.
    let rc = unsafe { libc::listen(listener.as_raw_fd(), backlog as libc::c_int) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    listener.set_nonblocking(true)
}

/// Removes the socket file when dropped
struct SocketFile {
    path: PathBuf,
}

impl Drop for SocketFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed socket file {}", self.path.display()),
            Err(ref e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

// =============================================================================
// Running Server Handle
// =============================================================================

/// Handle to a server started with [`Server::start`]
///
/// Dropping the handle stops the listener.
pub struct ServerHandle {
    socket_path: PathBuf,
    trigger: ShutdownTrigger,
    listener: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl ServerHandle {
    /// Path of the bound socket
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Whether the accept loop is still running
    pub fn is_running(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .map_or(false, |join| !join.is_finished())
    }

    /// A trigger that stops this server, e.g. for a signal handler
    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    /// Stop accepting, release the listener and remove the socket file
    ///
    /// Returns the accept loop's result. Calling this again returns `Ok(())`.
    pub fn stop(&self) -> Result<()> {
        self.trigger.fire();

        let join = self.listener.lock().take();
        match join {
            Some(join) => join.join().map_err(|_| VhostError::ListenerPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("Listener on {} stopped with error: {}", self.socket_path.display(), e);
        }
    }
}
