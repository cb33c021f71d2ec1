//! CLI Command Definitions
//!
//! Defines the command-line interface using clap.

pub mod answer;
pub mod offer;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Handle;
use tracing::info;

use icetun_core::{IceConnection, PeerRole, SessionConfig, WsTransport, device, session};

/// icetun - Peer-to-Peer TUN Tunnel
///
/// Negotiates connectivity with a remote host through a signaling server,
/// then bridges a local TUN device to the resulting transport.
#[derive(Parser, Debug)]
#[command(name = "icetun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Load defaults from a config file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Offer a tunnel
    ///
    /// Acts as the controlling side and waits for the peer to request the
    /// session descriptor before sending it.
    Offer(SessionArgs),

    /// Answer a tunnel
    ///
    /// Opens the signaling session, requests the peer's descriptor, and
    /// replies with its own.
    Answer(SessionArgs),
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Signaling url (eg wss://server:443)
    #[arg(long, value_name = "URL")]
    pub signaling_url: Option<String>,

    /// Signaling id of this host
    #[arg(long, value_name = "ID")]
    pub our_id: Option<String>,

    /// Signaling id of remote host to connect to
    #[arg(long, value_name = "ID")]
    pub remote_id: Option<String>,

    /// Virtual device name
    #[arg(long, value_name = "NAME")]
    pub dev: Option<String>,

    /// Interface address in CIDR form (eg 10.1.0.1/24)
    #[arg(long, value_name = "CIDR")]
    pub ip: Option<String>,

    /// Device MTU
    #[arg(long)]
    pub mtu: Option<u16>,

    /// Transport component count
    #[arg(long)]
    pub components: Option<u16>,

    /// Restrict candidate gathering to one local interface
    #[arg(long, value_name = "IFACE")]
    pub allow_iface: Option<String>,

    /// Gather IPv6 candidates as well
    #[arg(long)]
    pub ipv6: bool,

    /// Abort if candidate gathering takes longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub gather_timeout: Option<u64>,
}

impl SessionArgs {
    /// Merge CLI flags over file defaults into a validated config.
    pub fn into_config(self, file: Option<PathBuf>) -> Result<SessionConfig> {
        let mut config = match file {
            Some(path) => SessionConfig::load(&path)?,
            None => SessionConfig::default(),
        };

        if let Some(url) = self.signaling_url {
            config.signaling_url = url;
        }
        if let Some(id) = self.our_id {
            config.local_id = id;
        }
        if let Some(id) = self.remote_id {
            config.remote_id = id;
        }
        if let Some(dev) = self.dev {
            config.device = dev;
        }
        if let Some(ip) = self.ip {
            config.address = ip;
        }
        if let Some(mtu) = self.mtu {
            config.mtu = mtu;
        }
        if let Some(components) = self.components {
            config.components = components;
        }
        if let Some(iface) = self.allow_iface {
            config.allow_interface = Some(iface);
        }
        if self.ipv6 {
            config.use_ipv6 = true;
        }
        if let Some(secs) = self.gather_timeout {
            config.gather_timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Shared by the offer and answer commands.
pub(crate) async fn start(config: SessionConfig, role: PeerRole) -> Result<()> {
    info!(%role, id = %config.local_id, peer = %config.remote_id, "starting session");

    let conn = Arc::new(
        IceConnection::new(
            role.is_controlling(),
            &config.stun_server,
            config.use_ipv6,
            config.allow_interface.clone(),
        )
        .await?,
    );
    let transport = WsTransport::connect(&config.signaling_url).await?;

    let device_name = config.device.clone();
    let address = config.address.clone();
    let mtu = config.mtu;
    session::run(&config, role, Handle::current(), conn, transport, move || {
        device::open_tun(&device_name, &address, mtu)
    })
    .await?;

    Ok(())
}
