//! Parsed IrLAP frames.
//!
//! The byte-level codec (address/control octets, XID and QoS encodings,
//! byte stuffing, CRC) belongs to the medium. The state machine only sees the
//! decoded header and information field modeled here.

use std::fmt;

use crate::core::{BROADCAST_CONNECTION_ADDRESS, BROADCAST_DEVICE_ADDRESS, FINAL_SLOT};
use crate::qos::QosParams;

/// 32-bit device address chosen by each station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress(pub u32);

impl DeviceAddress {
    /// Address accepted by every station.
    pub const BROADCAST: DeviceAddress = DeviceAddress(BROADCAST_DEVICE_ADDRESS);

    /// Check if this is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<u32> for DeviceAddress {
    fn from(addr: u32) -> Self {
        DeviceAddress(addr)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Role a station plays on an established link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Issues polls and owns the final timer.
    Primary,
    /// Answers polls and owns the watchdog.
    Secondary,
}

/// Supervisory frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supervisory {
    /// RR: ready to receive.
    ReceiveReady,
    /// RNR: busy, do not send I frames.
    ReceiveNotReady,
    /// REJ: resend everything from Nr.
    Reject,
    /// SREJ: resend the frame numbered Nr.
    SelectiveReject,
}

/// Identity a station announces while being discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryInfo {
    /// Address of the announcing station.
    pub address: DeviceAddress,
    /// Service hint bits.
    pub hints: u16,
    /// Human readable station name.
    pub nickname: String,
}

/// XID frame fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xid {
    /// Sending station.
    pub source: DeviceAddress,
    /// Target station, usually broadcast for commands.
    pub destination: DeviceAddress,
    /// Number of slots announced by the discovering station.
    pub slots: u8,
    /// Current slot, or [`FINAL_SLOT`] on the closing command.
    pub slot: u8,
    /// Identity of the sender.
    pub info: Option<DiscoveryInfo>,
}

impl Xid {
    /// Check if this XID closes a discovery.
    pub fn is_final(&self) -> bool {
        self.slot == FINAL_SLOT
    }
}

/// SNRM frame fields.
///
/// A connect SNRM carries the new connection address and our parameters. A
/// reset SNRM is sent on the established link and carries neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snrm {
    /// Sending station.
    pub source: DeviceAddress,
    /// Target station.
    pub destination: DeviceAddress,
    /// Connection address assigned by the primary.
    pub connection_address: u8,
    /// Sender's capabilities; `None` on a reset.
    pub qos: Option<QosParams>,
}

/// UA frame fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ua {
    /// Sending station.
    pub source: DeviceAddress,
    /// Target station.
    pub destination: DeviceAddress,
    /// Sender's capabilities, present when answering a connect SNRM.
    pub qos: Option<QosParams>,
}

/// Frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// Numbered information frame.
    Info {
        /// Send sequence number.
        ns: u8,
        /// Receive sequence number.
        nr: u8,
        /// Information field.
        payload: Vec<u8>,
    },
    /// Unnumbered information frame.
    UnitData(Vec<u8>),
    /// Supervisory frame.
    Supervisory {
        /// RR, RNR, REJ or SREJ.
        kind: Supervisory,
        /// Receive sequence number.
        nr: u8,
    },
    /// Set normal response mode.
    Snrm(Snrm),
    /// Unnumbered acknowledge.
    Ua(Ua),
    /// Disconnect command.
    Disc,
    /// Request disconnect, sent by a secondary.
    RequestDisconnect,
    /// Disconnected mode response.
    DisconnectMode,
    /// Frame reject response.
    FrameReject,
    /// Exchange identification.
    Xid(Xid),
}

/// A decoded IrLAP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 7-bit connection address.
    pub connection_address: u8,
    /// Command (from primary) or response (from secondary).
    pub command: bool,
    /// Poll bit on commands, final bit on responses.
    pub pf: bool,
    /// Frame body.
    pub kind: FrameKind,
}

impl Frame {
    /// Build a command frame.
    pub fn command(connection_address: u8, pf: bool, kind: FrameKind) -> Self {
        Self {
            connection_address,
            command: true,
            pf,
            kind,
        }
    }

    /// Build a response frame.
    pub fn response(connection_address: u8, pf: bool, kind: FrameKind) -> Self {
        Self {
            connection_address,
            command: false,
            pf,
            kind,
        }
    }

    /// Check if the frame uses the broadcast connection address.
    pub fn is_broadcast(&self) -> bool {
        self.connection_address == BROADCAST_CONNECTION_ADDRESS
    }

    /// Length of the information field.
    pub fn payload_len(&self) -> usize {
        match &self.kind {
            FrameKind::Info { payload, .. } | FrameKind::UnitData(payload) => payload.len(),
            _ => 0,
        }
    }

    /// Short frame type name for logging.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            FrameKind::Info { .. } => "I",
            FrameKind::UnitData(_) => "UI",
            FrameKind::Supervisory { kind, .. } => match kind {
                Supervisory::ReceiveReady => "RR",
                Supervisory::ReceiveNotReady => "RNR",
                Supervisory::Reject => "REJ",
                Supervisory::SelectiveReject => "SREJ",
            },
            FrameKind::Snrm(_) => "SNRM",
            FrameKind::Ua(_) => "UA",
            FrameKind::Disc => "DISC",
            FrameKind::RequestDisconnect => "RD",
            FrameKind::DisconnectMode => "DM",
            FrameKind::FrameReject => "FRMR",
            FrameKind::Xid(_) => "XID",
        }
    }

    /// Check that the command/response bit fits the frame type.
    ///
    /// SNRM and DISC only exist as commands. UA, RD, DM and FRMR only exist as
    /// responses. Everything else may be either.
    pub fn has_valid_direction(&self) -> bool {
        match self.kind {
            FrameKind::Snrm(_) | FrameKind::Disc => self.command,
            FrameKind::Ua(_)
            | FrameKind::RequestDisconnect
            | FrameKind::DisconnectMode
            | FrameKind::FrameReject => !self.command,
            _ => true,
        }
    }
}
