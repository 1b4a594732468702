//! Helpers for driving a single connection in unit tests.

use std::time::{Duration, Instant};

use crate::config::LinkConfig;
use crate::connection::{Connection, Transmit};
use crate::core::BROADCAST_CONNECTION_ADDRESS;
use crate::event::LinkEvent;
use crate::frame::{DeviceAddress, Frame, FrameKind, Snrm, Supervisory, Ua, Xid};
use crate::qos::QosParams;
use crate::timer::TimerKind;

pub(crate) const PEER: u32 = 0x20;

pub(crate) struct Harness {
    pub conn: Connection,
    pub now: Instant,
}

impl Harness {
    pub fn new(address: u32) -> Self {
        Self::with_config(LinkConfig::new(address).with_rng_seed(7))
    }

    pub fn with_config(config: LinkConfig) -> Self {
        Self {
            conn: Connection::new(config).expect("valid config"),
            now: Instant::now(),
        }
    }

    /// Station 0x10 connected as primary to [`PEER`], waiting in NRM_P for
    /// the answer to its first poll.
    pub fn primary() -> Self {
        let mut h = Self::new(0x10);
        h.conn.connect_request(h.now, DeviceAddress(PEER)).unwrap();
        let caddr = h.conn.connection_address();
        h.receive(ua_from(PEER, 0x10, caddr, Some(default_qos())));
        h.transmits();
        h.events();
        h
    }

    /// Primary holding the turn in XMIT_P.
    pub fn primary_with_turn() -> Self {
        let mut h = Self::primary();
        let caddr = h.caddr();
        h.receive(supervisory_response(caddr, Supervisory::ReceiveReady, 0, true));
        h.transmits();
        h
    }

    /// Station 0x10 connected as secondary to [`PEER`], waiting in NRM_S.
    pub fn secondary() -> Self {
        let mut h = Self::new(0x10);
        h.receive(snrm_from(PEER, 0x10, 0x42));
        h.conn.connect_response(h.now).unwrap();
        h.transmits();
        h.events();
        h
    }

    pub fn caddr(&self) -> u8 {
        self.conn.connection_address()
    }

    pub fn receive(&mut self, frame: Frame) {
        self.conn.handle_frame(self.now, frame);
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        self.conn.handle_timeout(self.now);
    }

    /// Jump to the deadline of `kind` and deliver it.
    pub fn fire(&mut self, kind: TimerKind) {
        let deadline = self
            .conn
            .timers
            .deadline(kind)
            .unwrap_or_else(|| panic!("{kind} timer not armed"));
        self.now = self.now.max(deadline);
        self.conn.handle_timeout(self.now);
    }

    pub fn transmit_records(&mut self) -> Vec<Transmit> {
        std::iter::from_fn(|| self.conn.poll_transmit()).collect()
    }

    pub fn transmits(&mut self) -> Vec<Frame> {
        self.transmit_records().into_iter().map(|t| t.frame).collect()
    }

    pub fn events(&mut self) -> Vec<LinkEvent> {
        std::iter::from_fn(|| self.conn.poll_event()).collect()
    }
}

pub(crate) fn default_qos() -> QosParams {
    LinkConfig::default().qos
}

pub(crate) fn snrm_from(source: u32, destination: u32, caddr: u8) -> Frame {
    Frame::command(
        BROADCAST_CONNECTION_ADDRESS,
        true,
        FrameKind::Snrm(Snrm {
            source: DeviceAddress(source),
            destination: DeviceAddress(destination),
            connection_address: caddr,
            qos: Some(default_qos()),
        }),
    )
}

pub(crate) fn reset_snrm(source: u32, destination: u32, caddr: u8) -> Frame {
    Frame::command(
        caddr,
        true,
        FrameKind::Snrm(Snrm {
            source: DeviceAddress(source),
            destination: DeviceAddress(destination),
            connection_address: caddr,
            qos: None,
        }),
    )
}

pub(crate) fn ua_from(source: u32, destination: u32, caddr: u8, qos: Option<QosParams>) -> Frame {
    Frame::response(
        caddr,
        true,
        FrameKind::Ua(Ua {
            source: DeviceAddress(source),
            destination: DeviceAddress(destination),
            qos,
        }),
    )
}

pub(crate) fn xid_command(source: u32, slots: u8, slot: u8) -> Frame {
    Frame::command(
        BROADCAST_CONNECTION_ADDRESS,
        true,
        FrameKind::Xid(Xid {
            source: DeviceAddress(source),
            destination: DeviceAddress::BROADCAST,
            slots,
            slot,
            info: None,
        }),
    )
}

pub(crate) fn xid_response(source: u32, destination: u32, slots: u8, slot: u8) -> Frame {
    Frame::response(
        BROADCAST_CONNECTION_ADDRESS,
        true,
        FrameKind::Xid(Xid {
            source: DeviceAddress(source),
            destination: DeviceAddress(destination),
            slots,
            slot,
            info: None,
        }),
    )
}

pub(crate) fn info_response(caddr: u8, ns: u8, nr: u8, pf: bool, payload: &[u8]) -> Frame {
    Frame::response(
        caddr,
        pf,
        FrameKind::Info {
            ns,
            nr,
            payload: payload.to_vec(),
        },
    )
}

pub(crate) fn info_command(caddr: u8, ns: u8, nr: u8, pf: bool, payload: &[u8]) -> Frame {
    Frame::command(
        caddr,
        pf,
        FrameKind::Info {
            ns,
            nr,
            payload: payload.to_vec(),
        },
    )
}

pub(crate) fn supervisory_response(caddr: u8, kind: Supervisory, nr: u8, pf: bool) -> Frame {
    Frame::response(caddr, pf, FrameKind::Supervisory { kind, nr })
}

pub(crate) fn supervisory_command(caddr: u8, kind: Supervisory, nr: u8, pf: bool) -> Frame {
    Frame::command(caddr, pf, FrameKind::Supervisory { kind, nr })
}

/// Sequence numbers and poll bits of the I frames in `frames`.
pub(crate) fn info_frames(frames: &[Frame]) -> Vec<(u8, u8, bool)> {
    frames
        .iter()
        .filter_map(|f| match f.kind {
            FrameKind::Info { ns, nr, .. } => Some((ns, nr, f.pf)),
            _ => None,
        })
        .collect()
}
