//! Configuration for vhost-user-emu
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::dispatch::{DEFAULT_FEATURES, DEFAULT_PROTOCOL_FEATURES};
use crate::error::{Result, VhostError};

/// Socket path used when none is given
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/vhost-user-test-sock";

/// Main configuration for an emulator instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Listener Configuration
    // -------------------------------------------------------------------------
    /// Filesystem path of the Unix socket to bind
    pub socket_path: PathBuf,

    /// Pending-connection queue depth passed to listen(2)
    pub backlog: i32,

    /// How long the accept loop waits on the shutdown signal between
    /// accept attempts (milliseconds)
    pub accept_poll_ms: u64,

    // -------------------------------------------------------------------------
    // Advertised Features
    // -------------------------------------------------------------------------
    /// Bitmask returned for GET_FEATURES
    pub features: u64,

    /// Bitmask returned for GET_PROTOCOL_FEATURES
    pub protocol_features: u64,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Connection read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            backlog: 5,
            accept_poll_ms: 50,
            features: DEFAULT_FEATURES,
            protocol_features: DEFAULT_PROTOCOL_FEATURES,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject values the listener cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(VhostError::Config("socket path is empty".to_string()));
        }
        if self.backlog <= 0 {
            return Err(VhostError::Config(format!(
                "backlog must be positive, got {}",
                self.backlog
            )));
        }
        if self.accept_poll_ms == 0 {
            return Err(VhostError::Config(
                "accept poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the Unix socket path
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.socket_path = path.into();
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Set the accept poll interval (in milliseconds)
    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms;
        self
    }

    /// Set the advertised feature bitmask
    pub fn features(mut self, features: u64) -> Self {
        self.config.features = features;
        self
    }

    /// Set the advertised protocol-feature bitmask
    pub fn protocol_features(mut self, features: u64) -> Self {
        self.config.protocol_features = features;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
