//! Error types for icetun
//!
//! Provides a unified error handling strategy using thiserror.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for icetun operations
pub type Result<T> = std::result::Result<T, IcetunError>;

/// Unified error type for all icetun operations.
///
/// None of these are retried or recovered locally; every error surfaces to
/// the top-level runner, which logs it and exits with a non-zero status.
#[derive(Error, Debug)]
pub enum IcetunError {
    // ─────────────────────────────────────────────────────────────
    // Signaling Errors
    // ─────────────────────────────────────────────────────────────
    #[error("signaling protocol violation: {0}")]
    Protocol(String),

    #[error("signaling transport error: {0}")]
    Signaling(String),

    // ─────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────
    #[error("candidate gathering timed out after {0:?}")]
    GatherTimeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    // ─────────────────────────────────────────────────────────────
    // Relay Errors
    // ─────────────────────────────────────────────────────────────
    #[error("relay i/o error: {0}")]
    RelayIo(String),

    #[error("virtual device error: {0}")]
    Device(String),

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IcetunError {
    fn from(err: serde_json::Error) -> Self {
        IcetunError::Serialization(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for IcetunError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        IcetunError::Signaling(err.to_string())
    }
}

impl From<webrtc_ice::Error> for IcetunError {
    fn from(err: webrtc_ice::Error) -> Self {
        IcetunError::Transport(err.to_string())
    }
}

impl From<tun::Error> for IcetunError {
    fn from(err: tun::Error) -> Self {
        IcetunError::Device(err.to_string())
    }
}
