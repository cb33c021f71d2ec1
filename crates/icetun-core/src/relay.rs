//! Bidirectional best-effort packet bridge between a virtual device and the
//! transport's data component.
//!
//! Outbound frames read from the device go through a bounded queue drained
//! by one dedicated sender task, so device reads are never blocked on an
//! in-flight transport send while send ordering stays intact and a full
//! queue applies backpressure. Inbound delivery is strictly sequential: one
//! receive is awaited at a time and every non-empty payload is written to
//! the device verbatim, preserving transport order. Packet boundaries are
//! 1:1 in both directions.
//!
//! The relay runs until the first fatal error on either path; there is no
//! partial-failure recovery.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::trace;

use crate::connection::{Connection, DATA_COMPONENT};
use crate::error::{IcetunError, Result};

/// Headroom over the MTU when reading device frames.
const FRAME_HEADROOM: usize = 32;

/// Relay between one virtual device and one connected transport.
///
/// Owns the device and the transport exclusively for the process lifetime.
/// The sender task is spawned on the handle supplied at construction.
pub struct RelayLoop<C: Connection> {
    conn: Arc<C>,
    runtime: Handle,
    mtu: usize,
    queue_depth: usize,
}

impl<C: Connection> RelayLoop<C> {
    pub fn new(runtime: Handle, conn: Arc<C>, mtu: usize, queue_depth: usize) -> Self {
        Self {
            conn,
            runtime,
            mtu,
            queue_depth,
        }
    }

    /// Relay packets until a fatal error occurs on either path.
    pub async fn run<D>(self, device: D) -> Result<()>
    where
        D: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (device_read, device_write) = tokio::io::split(device);
        let (frame_tx, frame_rx) = mpsc::channel::<Bytes>(self.queue_depth);

        let sender = self
            .runtime
            .spawn(Self::drain_outbound(Arc::clone(&self.conn), frame_rx));

        tokio::select! {
            res = Self::read_device(device_read, frame_tx, self.mtu + FRAME_HEADROOM) => res,
            res = Self::write_device(device_write, Arc::clone(&self.conn)) => res,
            res = sender => match res {
                Ok(res) => res,
                Err(err) => Err(IcetunError::RelayIo(format!("sender task failed: {err}"))),
            },
        }
    }

    /// Outbound path: device frames into the bounded send queue.
    async fn read_device<R>(
        mut device: R,
        frames: mpsc::Sender<Bytes>,
        buf_size: usize,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; buf_size];
        loop {
            let n = device
                .read(&mut buf)
                .await
                .map_err(|err| IcetunError::RelayIo(format!("device read failed: {err}")))?;
            if n == 0 {
                // Idle frames are never forwarded; a zero-length read means
                // the device is gone.
                return Err(IcetunError::RelayIo("device closed".to_string()));
            }
            trace!(len = n, "device -> transport");
            if frames.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                return Err(IcetunError::RelayIo("send queue closed".to_string()));
            }
        }
    }

    /// Dedicated sender task: drains the queue in order.
    async fn drain_outbound(conn: Arc<C>, mut frames: mpsc::Receiver<Bytes>) -> Result<()> {
        while let Some(frame) = frames.recv().await {
            conn.send_to(&frame, DATA_COMPONENT)
                .await
                .map_err(|err| IcetunError::RelayIo(format!("transport send failed: {err}")))?;
        }
        Ok(())
    }

    /// Inbound path: transport payloads onto the device, in arrival order.
    async fn write_device<W>(mut device: W, conn: Arc<C>) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            let (payload, component) = conn
                .recv_from()
                .await
                .map_err(|err| IcetunError::RelayIo(format!("transport receive failed: {err}")))?;
            if payload.is_empty() {
                continue;
            }
            trace!(len = payload.len(), component, "transport -> device");
            device
                .write_all(&payload)
                .await
                .map_err(|err| IcetunError::RelayIo(format!("device write failed: {err}")))?;
        }
    }
}
