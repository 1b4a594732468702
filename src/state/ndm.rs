//! NDM: no link, contention mode.

use tracing::debug;

use super::{Event, LinkState, Outcome};
use crate::connection::Connection;
use crate::discovery::{self, DiscoverySession};
use crate::event::{DisconnectReason, LinkEvent};
use crate::frame::{DeviceAddress, DiscoveryInfo, Frame, FrameKind, Role, Snrm, Xid};
use crate::timer::TimerKind;

pub(super) fn handle(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::ConnectRequest { peer } => {
            if conn.media_busy {
                conn.emit(LinkEvent::DisconnectIndication(DisconnectReason::MediaBusy));
                return Outcome::Done;
            }
            conn.peer = Some(peer);
            conn.role = Role::Primary;
            conn.caddr = conn.generate_caddr();
            conn.retry_count = 0;
            conn.send_snrm(Some(conn.config.qos));
            conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
            conn.next_state(LinkState::Setup);
            Outcome::Done
        }

        Event::DiscoveryRequest { slots } => {
            if conn.media_busy {
                conn.emit(LinkEvent::DiscoveryConfirm(Vec::new()));
                return Outcome::Done;
            }
            conn.discovery = DiscoverySession::query(slots);
            conn.send_discovery_xid(slots, 0, true, DeviceAddress::BROADCAST);
            conn.discovery.next_slot = 1;
            conn.add_wait = false;
            conn.start_timer(TimerKind::Slot, conn.config.slot_timeout);
            conn.next_state(LinkState::Query);
            Outcome::Done
        }

        Event::Frame(Frame {
            kind:
                FrameKind::Snrm(Snrm {
                    source,
                    connection_address,
                    qos: Some(qos),
                    ..
                }),
            ..
        }) => {
            conn.peer = Some(source);
            conn.caddr = connection_address;
            conn.peer_qos = Some(qos);
            conn.role = Role::Secondary;
            conn.next_state(LinkState::Conn);
            conn.emit(LinkEvent::ConnectIndication { peer: source, qos });
            Outcome::Done
        }

        Event::Frame(Frame {
            command: true,
            kind: FrameKind::Xid(xid),
            ..
        }) => {
            if xid.is_final() {
                conn.emit(LinkEvent::DiscoveryIndication(discoverer_info(&xid)));
                return Outcome::Done;
            }

            let reply_slot = discovery::response_slot(&mut conn.rng, xid.slots, xid.slot);
            let answered = reply_slot == xid.slot;
            if answered {
                conn.send_discovery_xid(xid.slots, reply_slot, false, xid.source);
            }
            debug!(from = %xid.source, slots = xid.slots, reply_slot, "answering discovery");

            conn.discovery = DiscoverySession::reply(xid.slots, reply_slot, answered);
            conn.start_timer(
                TimerKind::Slot,
                discovery::query_timeout(conn.config.slot_timeout, xid.slots, xid.slot),
            );
            conn.next_state(LinkState::Reply);
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::UnitData(payload),
            ..
        }) => {
            conn.emit(LinkEvent::UnitDataIndication(payload));
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// Identity of the station that sent a discovery XID.
pub(super) fn discoverer_info(xid: &Xid) -> DiscoveryInfo {
    xid.info.clone().unwrap_or_else(|| DiscoveryInfo {
        address: xid.source,
        hints: 0,
        nickname: String::new(),
    })
}
