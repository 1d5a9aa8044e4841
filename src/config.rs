//! Configuration for MocapLink
//!
//! Loads configuration from a TOML file. The core consumes only the remote
//! endpoint; the recording section carries host-side settings such as the
//! session path.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// UDP command port the recording engine listens on
pub const DEFAULT_COMMAND_PORT: u16 = 6004;

fn default_command_port() -> u16 {
    DEFAULT_COMMAND_PORT
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MocapConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

/// Remote engine endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Device name used as a log prefix
    pub name: String,
    /// IP address of the recording engine
    pub remote_ip: String,
    /// UDP remote command port
    #[serde(default = "default_command_port")]
    pub command_port: u16,
}

/// Recording-session settings consumed by the host, not the core
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordingConfig {
    /// Directory the engine records sessions into, when known
    #[serde(default)]
    pub session_path: Option<PathBuf>,
}

impl MocapConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: MocapConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration for a locally running engine
    pub fn localhost_defaults() -> Self {
        Self {
            device: DeviceConfig {
                name: "mocap".to_string(),
                remote_ip: "127.0.0.1".to_string(),
                command_port: DEFAULT_COMMAND_PORT,
            },
            recording: RecordingConfig { session_path: None },
        }
    }

    /// Resolve the configured remote endpoint
    pub fn remote_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .device
            .remote_ip
            .parse()
            .map_err(|e| Error::Config(format!("invalid remote_ip {:?}: {}", self.device.remote_ip, e)))?;
        Ok(SocketAddr::new(ip, self.device.command_port))
    }
}

impl Default for MocapConfig {
    fn default() -> Self {
        Self::localhost_defaults()
    }
}
