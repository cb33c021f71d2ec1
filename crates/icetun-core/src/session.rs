//! Session orchestration: role selection, descriptor exchange, relay startup.
//!
//! Drives one session end to end: gather local candidates, run the
//! signaling handshake, exchange descriptors in the order fixed by role,
//! feed the remote side into the transport, open the virtual device, and
//! run the relay until it fails. Every step's error is surfaced to the
//! caller; nothing is retried.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{PeerRole, RelayState, SessionDescriptor};
use crate::relay::RelayLoop;
use crate::signaling::{SignalingChannel, SignalingTransport};

/// Run one tunnel session to completion.
///
/// `open_device` is invoked after signaling closes, right before the
/// transport's connectivity checks; tests substitute in-memory streams for
/// the TUN device there. Returns only on a fatal error.
pub async fn run<C, T, D, F>(
    config: &SessionConfig,
    role: PeerRole,
    runtime: Handle,
    conn: Arc<C>,
    transport: T,
    open_device: F,
) -> Result<()>
where
    C: Connection,
    T: SignalingTransport,
    D: AsyncRead + AsyncWrite + Send + 'static,
    F: FnOnce() -> Result<D> + Send,
{
    config.validate()?;
    let mut relay_state = RelayState::Idle;
    debug!(state = ?relay_state, "session starting");

    info!(%role, local_id = %config.local_id, "gathering local candidates");
    let candidates = conn.gather_candidates(config.gather_timeout()).await?;
    let (username, password) = conn.local_credentials().await?;
    info!(count = candidates.len(), "gathered local candidates");
    let local = SessionDescriptor {
        candidates,
        username,
        password,
    };

    let mut channel = SignalingChannel::new(
        transport,
        role,
        config.local_id.clone(),
        config.remote_id.clone(),
    );
    channel.handshake().await?;

    // Exactly one side transmits first, fixed by role.
    let remote = match role {
        PeerRole::Offer => {
            channel.send_descriptor(&local).await?;
            channel.recv_descriptor().await?
        }
        PeerRole::Answer => {
            let remote = channel.recv_descriptor().await?;
            channel.send_descriptor(&local).await?;
            remote
        }
    };

    for candidate in remote.candidates {
        conn.add_remote_candidate(Some(candidate)).await?;
    }
    conn.add_remote_candidate(None).await?;
    conn.set_remote_credentials(&remote.username, &remote.password)
        .await?;
    channel.close().await?;

    let device = open_device()?;
    conn.connect().await?;
    relay_state = RelayState::Connected;
    info!(%role, state = ?relay_state, "transport connected");

    relay_state = RelayState::Relaying;
    debug!(
        device = %config.device,
        mtu = config.mtu,
        state = ?relay_state,
        "starting relay"
    );
    let relay = RelayLoop::new(
        runtime,
        Arc::clone(&conn),
        usize::from(config.mtu),
        config.send_queue_depth,
    );
    let result = relay.run(device).await;
    if let Err(err) = &result {
        relay_state = RelayState::Failed;
        error!(state = ?relay_state, "relay terminated: {err}");
    }
    result
}
