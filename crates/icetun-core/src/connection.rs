//! The opaque packet transport consumed by the session and relay layers.
//!
//! Candidate gathering, STUN binding, and connectivity checks all live
//! behind this trait; the rest of the crate only ever sees opaque candidate
//! strings and a connected send/receive primitive. Any compliant
//! implementation, real or test double, is substitutable.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::Candidate;

/// The component number carrying tunneled packets.
pub const DATA_COMPONENT: u16 = 1;

/// A point-to-point packet transport negotiated out-of-band.
///
/// Futures are `Send` so sessions can run inside spawned tasks. Methods
/// take `&self`; implementations are expected to manage interior state.
pub trait Connection: Send + Sync + 'static {
    /// Gather local candidates, bounded by an optional deadline.
    ///
    /// Returns the complete ordered candidate list. Exceeding the deadline
    /// fails with [`IcetunError::GatherTimeout`](crate::IcetunError).
    fn gather_candidates(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<Vec<Candidate>>> + Send;

    /// Local `(username, password)` credentials for the descriptor.
    fn local_credentials(&self) -> impl Future<Output = Result<(String, String)>> + Send;

    /// Add one remote candidate, or `None` as the end-of-candidates marker.
    ///
    /// The marker must be added exactly once, after all remote candidates,
    /// to signal that candidate enumeration is complete.
    fn add_remote_candidate(
        &self,
        candidate: Option<Candidate>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Set the remote credentials received via signaling.
    fn set_remote_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Run connectivity checks and establish the transport.
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Send one packet on the given component.
    fn send_to(&self, data: &[u8], component: u16) -> impl Future<Output = Result<()>> + Send;

    /// Receive one packet and the component it arrived on.
    fn recv_from(&self) -> impl Future<Output = Result<(Vec<u8>, u16)>> + Send;
}
