//! Indications delivered to the service user.

use crate::frame::{DeviceAddress, DiscoveryInfo};
use crate::qos::QosParams;

/// Why a link went down, or never came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Other traffic was on the air.
    MediaBusy,
    /// The peer stopped answering.
    NoResponse,
    /// The peer disconnected, or our disconnect completed.
    PeerDisconnect,
    /// A link reset ended in disconnection.
    ResetIndication,
    /// Nobody answered our connect request.
    FoundNone,
}

/// Link status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Polls are going unanswered, the link may be about to drop.
    NoActivity,
}

/// Events read out with [`crate::Connection::poll_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A peer wants to connect. Answer with `connect_response`.
    ConnectIndication {
        /// Connecting station.
        peer: DeviceAddress,
        /// Parameters the peer offered.
        qos: QosParams,
    },
    /// The link is up.
    ConnectConfirm {
        /// Connected station.
        peer: DeviceAddress,
        /// Negotiated parameters.
        qos: QosParams,
    },
    /// The link is down.
    DisconnectIndication(DisconnectReason),
    /// Another station discovered us.
    DiscoveryIndication(DiscoveryInfo),
    /// Our discovery finished.
    DiscoveryConfirm(Vec<DiscoveryInfo>),
    /// Reliable data arrived.
    DataIndication(Vec<u8>),
    /// Unreliable data arrived.
    UnitDataIndication(Vec<u8>),
    /// Link status changed.
    StatusIndication(StatusCode),
    /// The link must be reset. Answer with `reset_request` (primary) or
    /// `reset_response` (secondary), or disconnect.
    ResetIndication,
    /// The reset completed.
    ResetConfirm,
}
