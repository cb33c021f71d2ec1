//! In-memory doubles for the signaling transport, the signaling server,
//! and the packet transport.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use icetun_core::{
    Candidate, Connection, DATA_COMPONENT, IcetunError, Result, SignalingTransport,
};

/// One endpoint of an in-memory message pipe.
pub struct MemoryTransport {
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
}

/// Two connected signaling endpoints.
pub fn transport_pair() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = mpsc::channel(16);
    let (b_tx, a_rx) = mpsc::channel(16);
    (
        MemoryTransport { tx: a_tx, rx: a_rx },
        MemoryTransport { tx: b_tx, rx: b_rx },
    )
}

impl SignalingTransport for MemoryTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.tx
            .send(text)
            .await
            .map_err(|_| IcetunError::Signaling("peer endpoint dropped".to_string()))
    }

    async fn recv_text(&mut self) -> Result<String> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| IcetunError::Signaling("peer endpoint dropped".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Two client endpoints joined by a minimal signaling server double.
///
/// The switch mirrors the deployed server's observable behavior: it
/// acknowledges `HELLO <id>` and `SESSION <id>` itself and forwards every
/// other frame to the opposite endpoint.
pub fn signaling_server() -> (MemoryTransport, MemoryTransport) {
    let (client_a, server_a) = transport_pair();
    let (client_b, server_b) = transport_pair();
    tokio::spawn(run_switch(server_a, server_b));
    (client_a, client_b)
}

async fn run_switch(a: MemoryTransport, b: MemoryTransport) {
    let mut a = SwitchPort::new(a);
    let mut b = SwitchPort::new(b);
    loop {
        let (msg, from_a) = tokio::select! {
            msg = a.transport.rx.recv() => match msg {
                Some(msg) => (msg, true),
                None => return,
            },
            msg = b.transport.rx.recv() => match msg {
                Some(msg) => (msg, false),
                None => return,
            },
        };
        let (sender, receiver) = if from_a { (&mut a, &mut b) } else { (&mut b, &mut a) };
        let ok = if msg.starts_with("HELLO ") {
            sender.register().await
        } else if msg.starts_with("SESSION ") {
            sender.reply("SESSION_OK").await
        } else {
            receiver.forward(msg).await
        };
        if !ok {
            return;
        }
    }
}

/// One server-side endpoint. Frames destined for a peer that has not
/// completed its greeting yet are held back, the way the deployed server
/// only forwards within an established session.
struct SwitchPort {
    transport: MemoryTransport,
    registered: bool,
    held: Vec<String>,
}

impl SwitchPort {
    fn new(transport: MemoryTransport) -> Self {
        Self {
            transport,
            registered: false,
            held: Vec::new(),
        }
    }

    async fn register(&mut self) -> bool {
        if !self.reply("HELLO").await {
            return false;
        }
        self.registered = true;
        for msg in std::mem::take(&mut self.held) {
            if self.transport.tx.send(msg).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn reply(&mut self, token: &str) -> bool {
        self.transport.tx.send(token.to_string()).await.is_ok()
    }

    async fn forward(&mut self, msg: String) -> bool {
        if self.registered {
            self.transport.tx.send(msg).await.is_ok()
        } else {
            self.held.push(msg);
            true
        }
    }
}

/// Recording packet transport with scriptable inbound and observable
/// outbound paths.
pub struct FakeConnection {
    candidates: Vec<Candidate>,
    username: String,
    password: String,
    outbound: mpsc::Sender<Vec<u8>>,
    inbound: Mutex<mpsc::Receiver<Vec<u8>>>,
    pub remote_candidates: StdMutex<Vec<String>>,
    pub end_markers: AtomicUsize,
    pub remote_credentials: StdMutex<Option<(String, String)>>,
    pub connected: AtomicBool,
}

impl FakeConnection {
    /// Standalone connection. Returns the feeder for `recv_from` payloads
    /// and the observer for `send_to` frames.
    pub fn new(
        candidates: &[&str],
        username: &str,
        password: &str,
    ) -> (Arc<Self>, mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let conn = Arc::new(Self::build(
            candidates,
            username,
            password,
            outbound_tx,
            inbound_rx,
        ));
        (conn, inbound_tx, outbound_rx)
    }

    /// Two connections wired back to back: whatever one sends, the other
    /// receives.
    pub fn pair(
        a: (&[&str], &str, &str),
        b: (&[&str], &str, &str),
    ) -> (Arc<Self>, Arc<Self>) {
        let (a_out, b_in) = mpsc::channel(64);
        let (b_out, a_in) = mpsc::channel(64);
        (
            Arc::new(Self::build(a.0, a.1, a.2, a_out, a_in)),
            Arc::new(Self::build(b.0, b.1, b.2, b_out, b_in)),
        )
    }

    fn build(
        candidates: &[&str],
        username: &str,
        password: &str,
        outbound: mpsc::Sender<Vec<u8>>,
        inbound: mpsc::Receiver<Vec<u8>>,
    ) -> Self {
        Self {
            candidates: candidates.iter().map(|c| Candidate::from(*c)).collect(),
            username: username.to_string(),
            password: password.to_string(),
            outbound,
            inbound: Mutex::new(inbound),
            remote_candidates: StdMutex::new(Vec::new()),
            end_markers: AtomicUsize::new(0),
            remote_credentials: StdMutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn recorded_candidates(&self) -> Vec<String> {
        self.remote_candidates.lock().unwrap().clone()
    }

    pub fn recorded_credentials(&self) -> Option<(String, String)> {
        self.remote_credentials.lock().unwrap().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Connection for FakeConnection {
    async fn gather_candidates(&self, _timeout: Option<Duration>) -> Result<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }

    async fn local_credentials(&self) -> Result<(String, String)> {
        Ok((self.username.clone(), self.password.clone()))
    }

    async fn add_remote_candidate(&self, candidate: Option<Candidate>) -> Result<()> {
        match candidate {
            Some(candidate) => self
                .remote_candidates
                .lock()
                .unwrap()
                .push(candidate.0),
            None => {
                self.end_markers.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn set_remote_credentials(&self, username: &str, password: &str) -> Result<()> {
        *self.remote_credentials.lock().unwrap() =
            Some((username.to_string(), password.to_string()));
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        if self.remote_credentials.lock().unwrap().is_none() {
            return Err(IcetunError::Transport(
                "remote credentials not set".to_string(),
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_to(&self, data: &[u8], component: u16) -> Result<()> {
        if component != DATA_COMPONENT {
            return Err(IcetunError::Transport(format!(
                "unsupported component {component}"
            )));
        }
        self.outbound
            .send(data.to_vec())
            .await
            .map_err(|_| IcetunError::Transport("transport closed".to_string()))
    }

    async fn recv_from(&self) -> Result<(Vec<u8>, u16)> {
        self.inbound
            .lock()
            .await
            .recv()
            .await
            .map(|data| (data, DATA_COMPONENT))
            .ok_or_else(|| IcetunError::Transport("transport closed".to_string()))
    }
}
