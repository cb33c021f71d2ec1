//! Configuration for icetun sessions.
//!
//! Holds operator defaults only (endpoints, device parameters); session
//! data such as candidates and credentials is ephemeral and never persisted.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IcetunError, Result};
use crate::ice::DEFAULT_STUN_SERVER;

/// Parameters for one tunnel session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Signaling server url (e.g. `wss://server:443`).
    pub signaling_url: String,

    /// Signaling id of this host.
    pub local_id: String,

    /// Signaling id of the remote host to connect to.
    pub remote_id: String,

    /// Virtual device name.
    pub device: String,

    /// Interface address in CIDR form (e.g. `10.1.0.1/24`).
    pub address: String,

    /// Device MTU.
    pub mtu: u16,

    /// Transport component count. The relay uses component 1 only.
    pub components: u16,

    /// Restrict candidate gathering to one local interface.
    pub allow_interface: Option<String>,

    /// Gather IPv6 candidates as well.
    pub use_ipv6: bool,

    /// Abort if candidate gathering exceeds this bound.
    pub gather_timeout_secs: Option<u64>,

    /// STUN server used for candidate discovery (`host:port`).
    pub stun_server: String,

    /// Depth of the bounded outbound send queue.
    pub send_queue_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: String::new(),
            local_id: String::new(),
            remote_id: String::new(),
            device: "icetun0".to_string(),
            address: String::new(),
            mtu: 1400,
            components: 1,
            allow_interface: None,
            use_ipv6: false,
            gather_timeout_secs: None,
            stun_server: DEFAULT_STUN_SERVER.to_string(),
            send_queue_depth: 64,
        }
    }
}

impl SessionConfig {
    /// Loads configuration from a file
    pub fn load(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| IcetunError::Config(e.to_string()))
    }

    /// Saves configuration to a file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| IcetunError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Returns the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("icetun")
            .join("config.toml")
    }

    /// Gather bound as a [`Duration`], if configured.
    pub fn gather_timeout(&self) -> Option<Duration> {
        self.gather_timeout_secs.map(Duration::from_secs)
    }

    /// Check that every field needed to run a session is usable.
    pub fn validate(&self) -> Result<()> {
        if self.signaling_url.is_empty() {
            return Err(IcetunError::Config("signaling url is required".to_string()));
        }
        if self.local_id.is_empty() || self.remote_id.is_empty() {
            return Err(IcetunError::Config(
                "local and remote signaling ids are required".to_string(),
            ));
        }
        if self.address.is_empty() {
            return Err(IcetunError::Config(
                "interface address is required".to_string(),
            ));
        }
        if self.mtu == 0 {
            return Err(IcetunError::Config("mtu must be non-zero".to_string()));
        }
        if self.components != 1 {
            return Err(IcetunError::Config(
                "only one transport component is supported".to_string(),
            ));
        }
        if self.send_queue_depth == 0 {
            return Err(IcetunError::Config(
                "send queue depth must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
