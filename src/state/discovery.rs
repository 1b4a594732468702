//! QUERY and REPLY: the two sides of a discovery.

use tracing::debug;

use super::ndm::discoverer_info;
use super::{Event, LinkState, Outcome};
use crate::connection::Connection;
use crate::core::{FINAL_SLOT, SLOT_RECEIVE_EXTENSION};
use crate::discovery;
use crate::event::LinkEvent;
use crate::frame::{DeviceAddress, Frame, FrameKind};
use crate::timer::TimerKind;

/// QUERY: we announce slots and collect answers.
pub(super) fn query(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::Frame(Frame {
            command: false,
            kind: FrameKind::Xid(xid),
            ..
        }) => {
            debug!(from = %xid.source, slot = xid.slot, "discovery answer");
            conn.discovery.log.insert(discoverer_info(&xid));
            Outcome::Done
        }

        // Another station finished its own discovery over ours.
        Event::Frame(Frame {
            command: true,
            kind: FrameKind::Xid(xid),
            ..
        }) if xid.is_final() => {
            conn.discovery.log.insert(discoverer_info(&xid));
            Outcome::Done
        }

        Event::Timer(TimerKind::Slot) => {
            if conn.medium_receiving && !conn.add_wait {
                conn.start_timer(TimerKind::Slot, SLOT_RECEIVE_EXTENSION);
                conn.add_wait = true;
                return Outcome::Done;
            }
            conn.add_wait = false;

            let slots = conn.discovery.slots;
            let slot = conn.discovery.next_slot;
            if slot < slots {
                conn.send_discovery_xid(slots, slot, true, DeviceAddress::BROADCAST);
                conn.discovery.next_slot += 1;
                conn.start_timer(TimerKind::Slot, conn.config.slot_timeout);
            } else {
                conn.send_discovery_xid(slots, FINAL_SLOT, true, DeviceAddress::BROADCAST);
                conn.next_state(LinkState::Ndm);
                let found = conn.discovery.log.take();
                debug!(found = found.len(), "discovery complete");
                conn.emit(LinkEvent::DiscoveryConfirm(found));
            }
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// REPLY: we answer once in our slot and stay quiet until the end.
pub(super) fn reply(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::Frame(Frame {
            command: true,
            kind: FrameKind::Xid(xid),
            ..
        }) => {
            conn.cancel_timer(TimerKind::Slot);

            if xid.is_final() {
                conn.next_state(LinkState::Ndm);
                conn.emit(LinkEvent::DiscoveryIndication(discoverer_info(&xid)));
                return Outcome::Done;
            }

            let session = &conn.discovery;
            if xid.slot >= session.reply_slot && !session.answered {
                let reply_slot = session.reply_slot;
                conn.send_discovery_xid(xid.slots, reply_slot, false, xid.source);
                conn.discovery.answered = true;
            }
            conn.start_timer(
                TimerKind::Slot,
                discovery::query_timeout(conn.config.slot_timeout, xid.slots, xid.slot),
            );
            Outcome::Done
        }

        Event::Timer(TimerKind::Slot) => {
            debug!("discovery ended without a final slot");
            conn.discovery.answered = false;
            conn.next_state(LinkState::Ndm);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::frame::Xid;

    fn xid_slots(frames: &[Frame]) -> Vec<u8> {
        frames
            .iter()
            .filter_map(|f| match &f.kind {
                FrameKind::Xid(Xid { slot, .. }) if f.command => Some(*slot),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_discovery_sends_s_plus_one_xids() {
        for slots in [1u8, 6, 8, 16] {
            let mut h = Harness::new(0x10);
            h.conn.discovery_request(h.now, slots).unwrap();
            assert_eq!(h.conn.state(), LinkState::Query);

            let mut sent = h.transmits();
            while h.conn.state() == LinkState::Query {
                h.fire(TimerKind::Slot);
                sent.extend(h.transmits());
            }

            let mut expected: Vec<u8> = (0..slots).collect();
            expected.push(FINAL_SLOT);
            assert_eq!(xid_slots(&sent), expected);

            let confirms = h
                .events()
                .into_iter()
                .filter(|e| matches!(e, LinkEvent::DiscoveryConfirm(_)))
                .count();
            assert_eq!(confirms, 1);
            assert_eq!(h.conn.poll_timeout(), None);
        }
    }

    #[test]
    fn test_discovery_collects_answers() {
        let mut h = Harness::new(0x10);
        h.conn.discovery_request(h.now, 6).unwrap();

        h.receive(xid_response(0x30, 0x10, 6, 0));
        h.fire(TimerKind::Slot);
        h.receive(xid_response(0x20, 0x10, 6, 1));
        // Answer addressed to someone else
        h.receive(xid_response(0x40, 0x99, 6, 1));
        while h.conn.state() == LinkState::Query {
            h.fire(TimerKind::Slot);
        }

        match h.events().as_slice() {
            [LinkEvent::DiscoveryConfirm(found)] => {
                let addresses: Vec<_> = found.iter().map(|i| i.address).collect();
                assert_eq!(addresses, vec![DeviceAddress(0x20), DeviceAddress(0x30)]);
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_discovery_invalid_slot_count() {
        let mut h = Harness::new(0x10);
        assert!(h.conn.discovery_request(h.now, 5).is_err());
        assert_eq!(h.conn.state(), LinkState::Ndm);
    }

    #[test]
    fn test_discovery_media_busy_confirms_empty() {
        let mut h = Harness::new(0x10);
        h.conn.set_media_busy(true);
        h.conn.discovery_request(h.now, 6).unwrap();

        assert_eq!(h.conn.state(), LinkState::Ndm);
        assert!(h.transmits().is_empty());
        assert_eq!(h.events(), vec![LinkEvent::DiscoveryConfirm(Vec::new())]);
    }

    #[test]
    fn test_slot_extension_while_receiving() {
        let mut h = Harness::new(0x10);
        h.conn.discovery_request(h.now, 6).unwrap();
        h.transmits();

        h.conn.set_medium_receiving(true);
        h.fire(TimerKind::Slot);
        // Extended once, nothing sent
        assert!(h.transmits().is_empty());
        let deadline = h.conn.timers.deadline(TimerKind::Slot).unwrap();
        assert_eq!(deadline - h.now, SLOT_RECEIVE_EXTENSION);

        h.fire(TimerKind::Slot);
        assert_eq!(xid_slots(&h.transmits()), vec![1]);
    }

    #[test]
    fn test_reply_answers_once_in_own_slot() {
        let mut h = Harness::new(0x10);
        h.receive(xid_command(0x20, 16, 0));
        assert_eq!(h.conn.state(), LinkState::Reply);

        let reply_slot = h.conn.discovery.reply_slot;
        let mut answers = h.transmits().len();
        for slot in 1..16 {
            h.receive(xid_command(0x20, 16, slot));
            answers += h.transmits().len();
            if slot >= reply_slot {
                assert_eq!(answers, 1, "answered by slot {slot}");
            }
        }
        assert_eq!(answers, 1);

        h.receive(xid_command(0x20, 16, FINAL_SLOT));
        assert_eq!(h.conn.state(), LinkState::Ndm);
        assert!(matches!(
            h.events().as_slice(),
            [LinkEvent::DiscoveryIndication(info)] if info.address == DeviceAddress(0x20)
        ));
        assert!(!h.conn.is_timer_armed(TimerKind::Slot));
    }

    #[test]
    fn test_reply_times_out_to_ndm() {
        let mut h = Harness::new(0x10);
        h.receive(xid_command(0x20, 6, 0));
        assert_eq!(h.conn.state(), LinkState::Reply);

        h.fire(TimerKind::Slot);
        assert_eq!(h.conn.state(), LinkState::Ndm);
        assert!(h.events().is_empty());
    }
}
