//! Signaling channel: handshake and descriptor exchange between two peers.
//!
//! The channel runs over any message transport (production: a websocket via
//! tokio-tungstenite) and agrees with the remote endpoint on message order
//! before exchanging exactly one session descriptor per direction. Which
//! side transmits first is fully determined by role, never negotiated
//! dynamically. Operations are strictly sequential; there is never a
//! concurrent send and receive pending at once.

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::{IcetunError, Result};
use crate::protocol::{
    HandshakeState, PeerRole, SessionDescriptor, TOKEN_HELLO, TOKEN_OFFER_REQUEST, TOKEN_SESSION,
    TOKEN_SESSION_OK,
};

/// A message-oriented signaling endpoint.
///
/// Narrow seam so the handshake can be tested against in-memory endpoints.
pub trait SignalingTransport: Send {
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<()>> + Send;
    fn recv_text(&mut self) -> impl Future<Output = Result<String>> + Send;
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Websocket signaling transport.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Connect to a signaling server (`ws://` or `wss://`).
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self { stream })
    }
}

impl SignalingTransport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String> {
        loop {
            let msg = self
                .stream
                .next()
                .await
                .ok_or_else(|| IcetunError::Signaling("signaling connection closed".to_string()))??;

            match msg {
                Message::Text(text) => return Ok(text),
                Message::Ping(data) => self.stream.send(Message::Pong(data)).await?,
                Message::Pong(_) => {}
                Message::Close(_) => {
                    return Err(IcetunError::Signaling(
                        "peer closed the signaling connection".to_string(),
                    ));
                }
                _ => {}
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // Closing an already-closed websocket is not an error here.
        let _ = self.stream.close(None).await;
        Ok(())
    }
}

/// Point-to-point handshake between two named signaling endpoints.
///
/// Tracks [`HandshakeState`]; transitions are strictly sequential and any
/// unexpected message at any step is a fatal [`IcetunError::Protocol`].
pub struct SignalingChannel<T: SignalingTransport> {
    transport: Option<T>,
    role: PeerRole,
    local_id: String,
    remote_id: String,
    state: HandshakeState,
}

impl<T: SignalingTransport> SignalingChannel<T> {
    pub fn new(transport: T, role: PeerRole, local_id: String, remote_id: String) -> Self {
        Self {
            transport: Some(transport),
            role,
            local_id,
            remote_id,
            state: HandshakeState::Connecting,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run the greeting exchange and agree on descriptor order.
    ///
    /// Sends `HELLO <local_id>` and requires the exact reply `HELLO`. The
    /// answering side then opens the session (`SESSION <remote_id>`,
    /// requiring `SESSION_OK`) and signals `OFFER_REQUEST`; the offering
    /// side blocks until that signal arrives.
    pub async fn handshake(&mut self) -> Result<()> {
        let greeting = format!("{} {}", TOKEN_HELLO, self.local_id);
        self.send_line(greeting).await?;
        self.state = HandshakeState::HelloSent;

        let reply = self.recv_line().await?;
        if reply != TOKEN_HELLO {
            return Err(self.unexpected(TOKEN_HELLO, &reply));
        }
        self.state = HandshakeState::HelloAcked;

        if self.role.requests_offer() {
            let open = format!("{} {}", TOKEN_SESSION, self.remote_id);
            self.send_line(open).await?;
            let reply = self.recv_line().await?;
            if reply != TOKEN_SESSION_OK {
                return Err(self.unexpected(TOKEN_SESSION_OK, &reply));
            }
            self.send_line(TOKEN_OFFER_REQUEST.to_string()).await?;
        } else {
            self.state = HandshakeState::AwaitingPeerReady;
            let reply = self.recv_line().await?;
            if reply != TOKEN_OFFER_REQUEST {
                return Err(self.unexpected(TOKEN_OFFER_REQUEST, &reply));
            }
        }
        self.state = HandshakeState::PeerReady;
        Ok(())
    }

    /// Serialize and transmit one session descriptor.
    pub async fn send_descriptor(&mut self, descriptor: &SessionDescriptor) -> Result<()> {
        let payload = descriptor.to_json()?;
        self.send_line(payload).await?;
        self.state = HandshakeState::DescriptorSent;
        Ok(())
    }

    /// Block for exactly one incoming descriptor message.
    pub async fn recv_descriptor(&mut self) -> Result<SessionDescriptor> {
        let payload = self.recv_line().await?;
        let descriptor = SessionDescriptor::from_json(&payload).map_err(|err| {
            IcetunError::Protocol(format!(
                "malformed session descriptor in state {:?}: {err}",
                self.state
            ))
        })?;
        self.state = HandshakeState::DescriptorReceived;
        Ok(descriptor)
    }

    /// Release the underlying transport. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await?;
        }
        self.state = HandshakeState::Closed;
        Ok(())
    }

    async fn send_line(&mut self, line: String) -> Result<()> {
        debug!("> {line}");
        self.transport_mut()?.send_text(line).await
    }

    async fn recv_line(&mut self) -> Result<String> {
        let line = self.transport_mut()?.recv_text().await?;
        debug!("< {line}");
        Ok(line)
    }

    fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport
            .as_mut()
            .ok_or_else(|| IcetunError::Signaling("signaling channel is closed".to_string()))
    }

    fn unexpected(&self, expected: &str, got: &str) -> IcetunError {
        IcetunError::Protocol(format!(
            "expected {expected}, got {got:?} (state {:?})",
            self.state
        ))
    }
}
