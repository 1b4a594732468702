//! CONN and SETUP: link establishment.

use tracing::{debug, warn};

use super::{Event, LinkState, Outcome};
use crate::connection::Connection;
use crate::event::{DisconnectReason, LinkEvent};
use crate::frame::{DeviceAddress, Frame, FrameKind, Role, Snrm, Ua};
use crate::timer::TimerKind;

/// CONN: a peer asked to connect and the upper layer has not answered yet.
pub(super) fn conn(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::ConnectResponse => {
            conn.negotiate(conn.peer_qos);
            conn.initiate_connection_state();
            conn.wait_min_turn_around();
            // Twice, in case the first one is lost.
            conn.send_ua(Some(conn.qos));
            conn.send_ua(Some(conn.qos));
            conn.apply_connection_parameters();
            conn.role = Role::Secondary;
            conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
            conn.next_state(LinkState::NrmS);
            Outcome::Done
        }

        Event::DisconnectRequest => {
            conn.send_dm();
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::Disc,
            ..
        }) => {
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// SETUP: our SNRM is outstanding.
pub(super) fn setup(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::Timer(TimerKind::Final) => {
            if conn.retry_count < conn.config.n3 {
                let backoff = conn.random_backoff();
                debug!(retry = conn.retry_count, ?backoff, "no answer to SNRM, backing off");
                conn.start_timer(TimerKind::Backoff, backoff);
            } else {
                warn!(peer = ?conn.peer, "connect failed, nobody answered");
                conn.link_down(DisconnectReason::FoundNone);
            }
            Outcome::Done
        }

        Event::Timer(TimerKind::Backoff) => {
            conn.send_snrm(Some(conn.config.qos));
            conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
            conn.retry_count += 1;
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::Snrm(snrm @ Snrm { qos: Some(_), .. }),
            ..
        }) => {
            accept_colliding_snrm(conn, snrm);
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::Ua(Ua { qos, .. }),
            ..
        }) => {
            conn.cancel_timer(TimerKind::Final);
            conn.negotiate(qos);
            conn.apply_connection_parameters();
            conn.initiate_connection_state();
            conn.role = Role::Primary;

            conn.wait_min_turn_around();
            conn.send_rr();
            // The secondary answers right after the poll.
            conn.start_timer(TimerKind::Final, conn.timing.final_timeout / 2);
            conn.next_state(LinkState::NrmP);

            let peer = conn.peer.unwrap_or(DeviceAddress::BROADCAST);
            conn.emit(LinkEvent::ConnectConfirm {
                peer,
                qos: conn.qos,
            });
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::Disc | FrameKind::DisconnectMode,
            ..
        }) => {
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// Both stations sent SNRM at once. The larger address becomes primary, so
/// we give in only to a larger peer.
fn accept_colliding_snrm(conn: &mut Connection, snrm: Snrm) {
    let local = conn.config.address;
    if snrm.source < local {
        debug!(peer = %snrm.source, "SNRM collision, keeping the primary role");
        return;
    }

    debug!(peer = %snrm.source, "SNRM collision, becoming secondary");
    conn.peer = Some(snrm.source);
    conn.caddr = snrm.connection_address;
    conn.peer_qos = snrm.qos;
    conn.negotiate(snrm.qos);
    conn.initiate_connection_state();
    conn.wait_min_turn_around();
    conn.send_ua(Some(conn.qos));
    conn.apply_connection_parameters();
    conn.role = Role::Secondary;
    conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
    conn.next_state(LinkState::NrmS);
    conn.emit(LinkEvent::ConnectConfirm {
        peer: snrm.source,
        qos: conn.qos,
    });
}
