//! icetun Core Library
//!
//! This crate provides the signaling and packet relay logic for icetun,
//! a point-to-point TUN tunnel negotiated over an out-of-band signaling
//! channel. It includes:
//! - The websocket signaling handshake and session descriptor exchange
//! - An opaque `Connection` transport trait with a webrtc-ice implementation
//! - TUN device creation and configuration
//! - The bidirectional packet relay loop
//! - Session orchestration for the offer and answer roles

pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod ice;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod signaling;

pub use config::SessionConfig;
pub use connection::{Connection, DATA_COMPONENT};
pub use error::{IcetunError, Result};
pub use ice::IceConnection;
pub use protocol::{
    Candidate, HandshakeState, PeerRole, RelayState, SessionDescriptor,
};
pub use relay::RelayLoop;
pub use signaling::{SignalingChannel, SignalingTransport, WsTransport};
