//! webrtc-ice backed implementation of the [`Connection`] trait.
//!
//! Wraps a `webrtc_ice::Agent`: gathering streams candidates through a
//! channel from the agent's `on_candidate` callback, and `connect()`
//! consumes the agent via `dial` (controlling side) or `accept`
//! (controlled side), storing the resulting packet connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;
use webrtc_ice::agent::Agent;
use webrtc_ice::agent::agent_config::AgentConfig;
use webrtc_ice::candidate::Candidate as IceCandidate;
use webrtc_ice::candidate::candidate_base::unmarshal_candidate;
use webrtc_ice::network_type::NetworkType;
use webrtc_ice::url::Url;
use webrtc_util::Conn;

use crate::connection::{Connection, DATA_COMPONENT};
use crate::error::{IcetunError, Result};
use crate::protocol::Candidate;

/// Well-known public STUN server used for candidate discovery.
pub const DEFAULT_STUN_SERVER: &str = "stun.l.google.com:19302";

/// Receive buffer for one transport packet.
const RECV_BUFFER_SIZE: usize = 65536;

/// ICE transport for one session.
///
/// Only component 1 carries data: webrtc-ice exposes a single packet
/// stream per agent.
pub struct IceConnection {
    agent: Mutex<Option<Agent>>,
    conn: Mutex<Option<Arc<dyn Conn + Send + Sync>>>,
    candidate_rx: Mutex<mpsc::Receiver<Option<String>>>,
    remote_credentials: Mutex<Option<(String, String)>>,
    controlling: bool,
    end_of_candidates: AtomicBool,
}

impl IceConnection {
    /// Create an agent bound to the given STUN server.
    ///
    /// `allow_interface` restricts candidate gathering to one local
    /// interface; `use_ipv6` additionally gathers IPv6 candidates.
    pub async fn new(
        controlling: bool,
        stun_server: &str,
        use_ipv6: bool,
        allow_interface: Option<String>,
    ) -> Result<Self> {
        let url = Url::parse_url(&format!("stun:{stun_server}")).map_err(|err| {
            IcetunError::Transport(format!("invalid STUN server {stun_server:?}: {err}"))
        })?;

        let mut network_types = vec![NetworkType::Udp4];
        if use_ipv6 {
            network_types.push(NetworkType::Udp6);
        }

        let config = AgentConfig {
            urls: vec![url],
            network_types,
            interface_filter: Arc::new(allow_interface.map(|name| {
                Box::new(move |interface: &str| interface == name)
                    as Box<dyn Fn(&str) -> bool + Send + Sync>
            })),
            ..Default::default()
        };

        let agent = Agent::new(config).await?;

        // Candidates stream through this channel; `None` marks the end of
        // gathering.
        let (candidate_tx, candidate_rx) = mpsc::channel(32);
        agent.on_candidate(Box::new(move |candidate| {
            let tx = candidate_tx.clone();
            Box::pin(async move {
                let _ = tx.send(candidate.map(|c| c.marshal())).await;
            })
        }));

        Ok(Self {
            agent: Mutex::new(Some(agent)),
            conn: Mutex::new(None),
            candidate_rx: Mutex::new(candidate_rx),
            remote_credentials: Mutex::new(None),
            controlling,
            end_of_candidates: AtomicBool::new(false),
        })
    }

    async fn data_conn(&self) -> Result<Arc<dyn Conn + Send + Sync>> {
        self.conn
            .lock()
            .await
            .clone()
            .ok_or_else(|| IcetunError::Transport("transport is not connected".to_string()))
    }
}

impl Connection for IceConnection {
    async fn gather_candidates(&self, timeout: Option<Duration>) -> Result<Vec<Candidate>> {
        {
            let agent = self.agent.lock().await;
            let agent = agent
                .as_ref()
                .ok_or_else(|| IcetunError::Transport("agent already consumed".to_string()))?;
            agent.gather_candidates()?;
        }

        let mut rx = self.candidate_rx.lock().await;
        let collect = async {
            let mut candidates = Vec::new();
            loop {
                match rx.recv().await {
                    Some(Some(candidate)) => {
                        debug!(%candidate, "gathered local candidate");
                        candidates.push(Candidate::from(candidate));
                    }
                    Some(None) | None => break,
                }
            }
            candidates
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| IcetunError::GatherTimeout(limit)),
            None => Ok(collect.await),
        }
    }

    async fn local_credentials(&self) -> Result<(String, String)> {
        let agent = self.agent.lock().await;
        let agent = agent
            .as_ref()
            .ok_or_else(|| IcetunError::Transport("agent already consumed".to_string()))?;
        Ok(agent.get_local_user_credentials().await)
    }

    async fn add_remote_candidate(&self, candidate: Option<Candidate>) -> Result<()> {
        match candidate {
            Some(candidate) => {
                if self.end_of_candidates.load(Ordering::SeqCst) {
                    return Err(IcetunError::Transport(
                        "remote candidate after end-of-candidates marker".to_string(),
                    ));
                }
                let agent = self.agent.lock().await;
                let agent = agent
                    .as_ref()
                    .ok_or_else(|| IcetunError::Transport("agent already consumed".to_string()))?;
                let parsed = unmarshal_candidate(candidate.as_str()).map_err(|err| {
                    IcetunError::Transport(format!("invalid remote candidate {candidate}: {err}"))
                })?;
                let parsed: Arc<dyn IceCandidate + Send + Sync> = Arc::new(parsed);
                agent.add_remote_candidate(&parsed)?;
            }
            None => {
                if self.end_of_candidates.swap(true, Ordering::SeqCst) {
                    return Err(IcetunError::Transport(
                        "end-of-candidates marker added twice".to_string(),
                    ));
                }
                debug!("end of remote candidates");
            }
        }
        Ok(())
    }

    async fn set_remote_credentials(&self, username: &str, password: &str) -> Result<()> {
        *self.remote_credentials.lock().await =
            Some((username.to_string(), password.to_string()));
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        let agent = self
            .agent
            .lock()
            .await
            .take()
            .ok_or_else(|| IcetunError::Transport("connection already established".to_string()))?;
        let (ufrag, pwd) = self
            .remote_credentials
            .lock()
            .await
            .clone()
            .ok_or_else(|| IcetunError::Transport("remote credentials not set".to_string()))?;

        // The cancel sender must stay alive for the duration of the
        // connectivity checks; dropping it aborts them.
        let (_cancel_tx, cancel_rx) = mpsc::channel(1);
        let conn: Arc<dyn Conn + Send + Sync> = if self.controlling {
            agent.dial(cancel_rx, ufrag, pwd).await?
        } else {
            agent.accept(cancel_rx, ufrag, pwd).await?
        };

        *self.conn.lock().await = Some(conn);
        Ok(())
    }

    async fn send_to(&self, data: &[u8], component: u16) -> Result<()> {
        if component != DATA_COMPONENT {
            return Err(IcetunError::Transport(format!(
                "unsupported component {component}"
            )));
        }
        let conn = self.data_conn().await?;
        conn.send(data)
            .await
            .map_err(|err| IcetunError::Transport(format!("ice send failed: {err}")))?;
        Ok(())
    }

    async fn recv_from(&self) -> Result<(Vec<u8>, u16)> {
        let conn = self.data_conn().await?;
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let n = conn
            .recv(&mut buf)
            .await
            .map_err(|err| IcetunError::Transport(format!("ice receive failed: {err}")))?;
        buf.truncate(n);
        Ok((buf, DATA_COMPONENT))
    }
}
