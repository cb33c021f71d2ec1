//! End-to-end session tests: two peers, in-memory signaling and transport.

mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
use tokio::runtime::Handle;
use tokio::time::{sleep, timeout};

use icetun_core::{PeerRole, SessionConfig, session};
use support::{FakeConnection, signaling_server};

fn test_config(local: &str, remote: &str) -> SessionConfig {
    SessionConfig {
        signaling_url: "ws://signal.test".to_string(),
        local_id: local.to_string(),
        remote_id: remote.to_string(),
        address: "10.9.0.1/24".to_string(),
        ..Default::default()
    }
}

async fn wait_connected(conn: &FakeConnection) {
    timeout(Duration::from_secs(2), async {
        while !conn.is_connected() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session must reach the connected state");
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_session_relays_packets() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();

    let (offer_signaling, answer_signaling) = signaling_server();
    let (offer_conn, answer_conn) =
        FakeConnection::pair((&["c1", "c2"], "u1", "p1"), (&["c3"], "u2", "p2"));

    let (mut offer_local, offer_device) = duplex(64 * 1024);
    let (mut answer_local, answer_device) = duplex(64 * 1024);

    let offer_task = {
        let conn = Arc::clone(&offer_conn);
        let config = test_config("alice", "bob");
        tokio::spawn(async move {
            session::run(
                &config,
                PeerRole::Offer,
                Handle::current(),
                conn,
                offer_signaling,
                move || Ok(offer_device),
            )
            .await
        })
    };
    let answer_task = {
        let conn = Arc::clone(&answer_conn);
        let config = test_config("bob", "alice");
        tokio::spawn(async move {
            session::run(
                &config,
                PeerRole::Answer,
                Handle::current(),
                conn,
                answer_signaling,
                move || Ok(answer_device),
            )
            .await
        })
    };

    wait_connected(&offer_conn).await;
    wait_connected(&answer_conn).await;

    // Each side holds the other's candidates, the end marker, and the
    // other's credentials.
    assert_eq!(offer_conn.recorded_candidates(), vec!["c3".to_string()]);
    assert_eq!(
        offer_conn.end_markers.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        offer_conn.recorded_credentials(),
        Some(("u2".to_string(), "p2".to_string()))
    );

    assert_eq!(
        answer_conn.recorded_candidates(),
        vec!["c1".to_string(), "c2".to_string()]
    );
    assert_eq!(
        answer_conn.end_markers.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        answer_conn.recorded_credentials(),
        Some(("u1".to_string(), "p1".to_string()))
    );

    // A frame written to the offer side's device arrives verbatim at the
    // answer side's device.
    offer_local.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    timeout(Duration::from_secs(2), answer_local.read_exact(&mut buf))
        .await
        .expect("payload must cross the tunnel")
        .unwrap();
    assert_eq!(&buf, b"ping");

    // And the reverse direction.
    answer_local.write_all(b"pong").await.unwrap();
    timeout(Duration::from_secs(2), offer_local.read_exact(&mut buf))
        .await
        .expect("payload must cross the tunnel")
        .unwrap();
    assert_eq!(&buf, b"pong");

    offer_task.abort();
    answer_task.abort();
}

#[tokio::test]
async fn session_rejects_invalid_config() {
    let (offer_signaling, _answer_signaling) = signaling_server();
    let (conn, _inbound, _outbound) = FakeConnection::new(&[], "u", "p");

    let mut config = test_config("alice", "bob");
    config.components = 3;

    let result = session::run(
        &config,
        PeerRole::Offer,
        Handle::current(),
        conn,
        offer_signaling,
        || Ok(tokio::io::duplex(16).0),
    )
    .await;
    assert!(result.is_err());
}
