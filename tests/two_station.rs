//! Two stations talking over a lossless (or selectively lossy) loopback
//! with a virtual clock.

use std::time::Instant;

use irlap::prelude::*;

const ALPHA: u32 = 0x0000_0010;
const BETA: u32 = 0x0000_0020;

struct Air {
    now: Instant,
    a: Connection,
    b: Connection,
    a_events: Vec<LinkEvent>,
    b_events: Vec<LinkEvent>,
    /// Frames sent by station A so far; used by loss filters.
    a_sent: Vec<Frame>,
    /// Drop frames from A for which this returns true.
    drop_from_a: Box<dyn FnMut(&Frame) -> bool>,
}

impl Air {
    fn new() -> Self {
        let a = LinkConfig::new(ALPHA)
            .with_rng_seed(1)
            .with_nickname("alpha");
        let b = LinkConfig::new(BETA).with_rng_seed(2).with_nickname("beta");
        Self {
            now: Instant::now(),
            a: Connection::new(a).unwrap(),
            b: Connection::new(b).unwrap(),
            a_events: Vec::new(),
            b_events: Vec::new(),
            a_sent: Vec::new(),
            drop_from_a: Box::new(|_: &Frame| false),
        }
    }

    /// Exchange frames until both stations are quiet.
    fn settle(&mut self) {
        loop {
            let from_a: Vec<Frame> = std::iter::from_fn(|| self.a.poll_transmit())
                .map(|t| t.frame)
                .collect();
            let from_b: Vec<Frame> = std::iter::from_fn(|| self.b.poll_transmit())
                .map(|t| t.frame)
                .collect();
            if from_a.is_empty() && from_b.is_empty() {
                break;
            }
            for frame in from_a {
                self.a_sent.push(frame.clone());
                if !(self.drop_from_a)(&frame) {
                    self.b.handle_frame(self.now, frame);
                }
            }
            for frame in from_b {
                self.a.handle_frame(self.now, frame);
            }
        }
        self.a_events.extend(std::iter::from_fn(|| self.a.poll_event()));
        self.b_events.extend(std::iter::from_fn(|| self.b.poll_event()));
    }

    /// Advance the clock to the next timer and fire it.
    fn tick(&mut self) -> bool {
        let next = match (self.a.poll_timeout(), self.b.poll_timeout()) {
            (Some(a), Some(b)) => a.min(b),
            (Some(t), None) | (None, Some(t)) => t,
            (None, None) => return false,
        };
        self.now = self.now.max(next);
        self.a.handle_timeout(self.now);
        self.b.handle_timeout(self.now);
        self.settle();
        true
    }

    fn run_until(&mut self, mut done: impl FnMut(&Air) -> bool) {
        self.settle();
        for _ in 0..500 {
            if done(self) {
                return;
            }
            if !self.tick() {
                break;
            }
        }
        assert!(done(self), "condition not reached; a={} b={}", self.a.state(), self.b.state());
    }

    fn connect(&mut self) {
        self.a.connect_request(self.now, DeviceAddress(BETA)).unwrap();
        self.settle();
        assert_eq!(self.b.state(), LinkState::Conn);
        self.b.connect_response(self.now).unwrap();
        self.run_until(|air| air.a.state().is_connected() && air.b.state().is_connected());
    }

    fn data_for(events: &[LinkEvent]) -> Vec<Vec<u8>> {
        events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::DataIndication(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn test_discovery_finds_peer() {
    let mut air = Air::new();
    air.a.discovery_request(air.now, 6).unwrap();

    air.run_until(|air| air.a.state() == LinkState::Ndm && air.b.state() == LinkState::Ndm);

    let found = air
        .a_events
        .iter()
        .find_map(|e| match e {
            LinkEvent::DiscoveryConfirm(found) => Some(found.clone()),
            _ => None,
        })
        .expect("discovery confirm");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].address, DeviceAddress(BETA));
    assert_eq!(found[0].nickname, "beta");

    assert!(air.b_events.iter().any(|e| matches!(
        e,
        LinkEvent::DiscoveryIndication(info) if info.address == DeviceAddress(ALPHA)
    )));
}

#[test]
fn test_connect_establishes_roles() {
    let mut air = Air::new();
    air.connect();

    assert_eq!(air.a.role(), Role::Primary);
    assert_eq!(air.b.role(), Role::Secondary);
    assert_eq!(air.a.connection_address(), air.b.connection_address());
    assert!(matches!(
        air.a_events.as_slice(),
        [LinkEvent::ConnectConfirm { peer: DeviceAddress(BETA), .. }]
    ));
    assert!(matches!(
        air.b_events.as_slice(),
        [LinkEvent::ConnectIndication { peer: DeviceAddress(ALPHA), .. }]
    ));
    assert_eq!(air.a.qos(), air.b.qos());
}

#[test]
fn test_bidirectional_data() {
    let mut air = Air::new();
    air.connect();

    for i in 0..10u8 {
        air.a.data_request(air.now, vec![b'a', i]).unwrap();
        air.b.data_request(air.now, vec![b'b', i]).unwrap();
    }
    air.run_until(|air| {
        Air::data_for(&air.a_events).len() == 10 && Air::data_for(&air.b_events).len() == 10
    });

    let expected_at_b: Vec<Vec<u8>> = (0..10u8).map(|i| vec![b'a', i]).collect();
    let expected_at_a: Vec<Vec<u8>> = (0..10u8).map(|i| vec![b'b', i]).collect();
    assert_eq!(Air::data_for(&air.b_events), expected_at_b);
    assert_eq!(Air::data_for(&air.a_events), expected_at_a);

    // Everything acknowledged once the link goes idle.
    air.run_until(|air| air.a.window().unacked_len() == 0 && air.b.window().unacked_len() == 0);
}

#[test]
fn test_lost_frame_is_retransmitted() {
    let mut air = Air::new();
    air.connect();

    let mut dropped = false;
    air.drop_from_a = Box::new(move |frame: &Frame| {
        if !dropped && matches!(frame.kind, FrameKind::Info { ns: 1, .. }) {
            dropped = true;
            return true;
        }
        false
    });

    for i in 0..4u8 {
        air.a.data_request(air.now, vec![i]).unwrap();
    }
    air.run_until(|air| Air::data_for(&air.b_events).len() == 4);

    assert_eq!(
        Air::data_for(&air.b_events),
        vec![vec![0], vec![1], vec![2], vec![3]]
    );
    let ns1_sent = air
        .a_sent
        .iter()
        .filter(|f| matches!(f.kind, FrameKind::Info { ns: 1, .. }))
        .count();
    assert!(ns1_sent >= 2);
}

#[test]
fn test_simultaneous_connect_resolved_by_address() {
    let mut air = Air::new();
    air.a.connect_request(air.now, DeviceAddress(BETA)).unwrap();
    air.b.connect_request(air.now, DeviceAddress(ALPHA)).unwrap();

    air.run_until(|air| air.a.state().is_connected() && air.b.state().is_connected());

    // The larger address keeps the primary role.
    assert_eq!(air.b.role(), Role::Primary);
    assert_eq!(air.a.role(), Role::Secondary);
    assert!(air.a_events.iter().any(|e| matches!(e, LinkEvent::ConnectConfirm { .. })));
    assert!(air.b_events.iter().any(|e| matches!(e, LinkEvent::ConnectConfirm { .. })));
}

#[test]
fn test_disconnect_from_primary() {
    let mut air = Air::new();
    air.connect();
    air.a.data_request(air.now, b"last words".to_vec()).unwrap();
    air.a.disconnect_request(air.now).unwrap();

    air.run_until(|air| air.a.state() == LinkState::Ndm && air.b.state() == LinkState::Ndm);

    assert_eq!(Air::data_for(&air.b_events), vec![b"last words".to_vec()]);
    assert!(air.a_events.contains(&LinkEvent::DisconnectIndication(
        DisconnectReason::PeerDisconnect
    )));
    assert!(air.b_events.contains(&LinkEvent::DisconnectIndication(
        DisconnectReason::PeerDisconnect
    )));
    assert_eq!(air.a.connection_address(), BROADCAST_CONNECTION_ADDRESS);
}

#[test]
fn test_disconnect_from_secondary() {
    let mut air = Air::new();
    air.connect();
    air.b.disconnect_request(air.now).unwrap();

    air.run_until(|air| air.a.state() == LinkState::Ndm && air.b.state() == LinkState::Ndm);
    assert!(air.b_events.contains(&LinkEvent::DisconnectIndication(
        DisconnectReason::PeerDisconnect
    )));
}

#[test]
fn test_silent_secondary_is_dropped() {
    let mut air = Air::new();
    air.connect();
    air.drop_from_a = Box::new(|_: &Frame| true);

    air.run_until(|air| air.a.state() == LinkState::Ndm && air.b.state() == LinkState::Ndm);

    assert!(air.a_events.contains(&LinkEvent::DisconnectIndication(
        DisconnectReason::NoResponse
    )));
    assert!(air.b_events.contains(&LinkEvent::DisconnectIndication(
        DisconnectReason::NoResponse
    )));
}

#[test]
fn test_unit_data_in_ndm() {
    let mut air = Air::new();
    air.a.unit_data_request(air.now, b"beacon".to_vec()).unwrap();
    air.settle();

    assert_eq!(
        air.b_events,
        vec![LinkEvent::UnitDataIndication(b"beacon".to_vec())]
    );
}
