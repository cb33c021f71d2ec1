//! icetun Signaling Protocol Definition
//!
//! Defines the wire protocol for the out-of-band signaling exchange.
//! The handshake is a short sequence of exact text tokens followed by one
//! JSON session descriptor per direction. Any reply other than the exact
//! expected token at any step is a fatal protocol violation; there is no
//! retry or resynchronization within a session.

use serde::{Deserialize, Serialize};

/// Greeting sent on connect (`HELLO <id>`); the exact expected reply.
pub const TOKEN_HELLO: &str = "HELLO";

/// Session-open request sent by the side soliciting the offer (`SESSION <id>`).
pub const TOKEN_SESSION: &str = "SESSION";

/// Exact expected reply to a session-open request.
pub const TOKEN_SESSION_OK: &str = "SESSION_OK";

/// Ready signal telling the offering side to transmit its descriptor.
pub const TOKEN_OFFER_REQUEST: &str = "OFFER_REQUEST";

/// Role of one side of a session. Exactly one side is `Offer`.
///
/// The role determines the handshake message order, the descriptor exchange
/// order, and the ICE controlling flag. Note the observed direction: the
/// `Answer` side actively opens the signaling session and requests the
/// offer, while the `Offer` side passively waits to be told to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Sends its descriptor first (once requested); ICE controlling agent.
    Offer,
    /// Opens the signaling session, receives the offer first, then answers.
    Answer,
}

impl PeerRole {
    /// Whether this side acts as the ICE controlling agent.
    pub fn is_controlling(&self) -> bool {
        matches!(self, PeerRole::Offer)
    }

    /// Whether this side opens the signaling session and solicits the offer.
    pub fn requests_offer(&self) -> bool {
        matches!(self, PeerRole::Answer)
    }
}

impl std::fmt::Display for PeerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerRole::Offer => write!(f, "offer"),
            PeerRole::Answer => write!(f, "answer"),
        }
    }
}

/// One reachable transport address, as an opaque serialized string.
///
/// Produced and consumed only by the transport implementation; the
/// signaling and relay layers never inspect its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(pub String);

impl Candidate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Candidate {
    fn from(s: String) -> Self {
        Candidate(s)
    }
}

impl From<&str> for Candidate {
    fn from(s: &str) -> Self {
        Candidate(s.to_string())
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One side's complete connectivity offer, exchanged exactly once per
/// direction per session and discarded after the handshake completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// Ordered candidate list, in gathering order.
    pub candidates: Vec<Candidate>,
    /// Local transport username fragment.
    pub username: String,
    /// Local transport password.
    pub password: String,
}

impl SessionDescriptor {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Handshake progress of a [`SignalingChannel`](crate::SignalingChannel).
/// Transitions are strictly sequential; there are no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Connecting,
    HelloSent,
    HelloAcked,
    AwaitingPeerReady,
    PeerReady,
    DescriptorSent,
    DescriptorReceived,
    Closed,
}

/// Relay lifecycle, owned by the session orchestrator. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Connected,
    Relaying,
    Failed,
}
