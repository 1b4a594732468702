//! Error types for IrLAP.
//!
//! Only service requests and configuration surface errors. Inbound frames and
//! timer expiries that a state cannot use are logged and discarded by the
//! dispatcher instead.

use std::io;

use thiserror::Error;

use crate::state::LinkState;

/// Errors found while validating a [`crate::LinkConfig`] or QoS parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Retry thresholds must escalate: warning before teardown before giving up.
    #[error("retry thresholds must satisfy 0 < N1 < N2 < N3, got N1={n1} N2={n2} N3={n3}")]
    RetryThresholds {
        /// Status indication threshold.
        n1: u32,
        /// Link teardown threshold.
        n2: u32,
        /// Connect/disconnect retry ceiling.
        n3: u32,
    },

    /// Window size outside 1..=7.
    #[error("window size {0} outside 1..=7")]
    WindowSize(u8),

    /// Baud rate not in the supported set.
    #[error("unsupported baud rate {0}")]
    BaudRate(u32),

    /// Zero data size.
    #[error("data size must be non-zero")]
    ZeroDataSize,

    /// Zero maximum turnaround time.
    #[error("maximum turnaround time must be non-zero")]
    ZeroTurnTime,

    /// Zero discovery slot timeout.
    #[error("slot timeout must be non-zero")]
    ZeroSlotTimeout,

    /// Zero transmit queue limit.
    #[error("transmit queue limit must be non-zero")]
    ZeroQueueLimit,

    /// Discovery slot count not in {1, 6, 8, 16}.
    #[error("invalid discovery slot count {0}")]
    SlotCount(u8),
}

/// Top-level IrLAP errors.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The current state does not accept this service request.
    #[error("{request} not accepted in state {state}")]
    InvalidRequest {
        /// State the connection was in.
        state: LinkState,
        /// Name of the rejected request.
        request: &'static str,
    },

    /// Data request without an established link.
    #[error("link not connected")]
    NotConnected,

    /// Transmit queue is at its configured limit.
    #[error("transmit queue full")]
    QueueFull,

    /// Payload exceeds the negotiated data size.
    #[error("payload of {len} bytes exceeds negotiated data size {max}")]
    PayloadTooLarge {
        /// Offered payload length.
        len: usize,
        /// Negotiated maximum.
        max: usize,
    },

    /// The medium reported traffic from another station.
    #[error("media busy")]
    MediaBusy,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Driver channel closed.
    #[error("driver channel closed")]
    ChannelClosed,

    /// Medium I/O error.
    #[error("medium i/o error: {0}")]
    Io(#[from] io::Error),
}

impl LinkError {
    /// Check if this error ends the driver loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::ChannelClosed | LinkError::Io(_))
    }

    /// Check if retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LinkError::QueueFull | LinkError::MediaBusy | LinkError::InvalidRequest { .. }
        )
    }
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
