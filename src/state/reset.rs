//! RESET_WAIT, RESET and RESET_CHECK: resynchronising a link after a
//! sequence error.
//!
//! A reset is always started by the upper layer: the primary with
//! [`Connection::reset_request`] after a reset indication, the secondary
//! with [`Connection::reset_response`] once the primary's SNRM arrived.

use tracing::{debug, warn};

use super::primary::take_turn;
use super::{Event, LinkState, Outcome};
use crate::connection::Connection;
use crate::event::{DisconnectReason, LinkEvent};
use crate::frame::{Frame, FrameKind, Role, Snrm, Ua};
use crate::timer::TimerKind;

/// RESET_WAIT: the primary reported a reset indication.
pub(super) fn reset_wait(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::ResetRequest => {
            if conn.xmitflag {
                conn.wait_min_turn_around();
                conn.send_snrm(None);
            }
            // Otherwise the secondary still holds the turn; the SNRM goes
            // out when the final timer expires in RESET.
            conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
            conn.retry_count = 0;
            conn.next_state(LinkState::Reset);
            Outcome::Done
        }

        Event::DisconnectRequest => {
            conn.primary_disconnect();
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// RESET: our reset SNRM is outstanding.
pub(super) fn reset(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::Frame(Frame {
            kind: FrameKind::Ua(Ua { qos: None, .. }),
            ..
        }) => {
            conn.cancel_timer(TimerKind::Final);
            conn.initiate_connection_state();
            conn.bytes_left = conn.timing.line_capacity;
            debug!(peer = ?conn.peer, "link reset");
            conn.emit(LinkEvent::ResetConfirm);
            take_turn(conn);
            Outcome::Done
        }

        Event::Timer(TimerKind::Final) => {
            if conn.retry_count < conn.config.n3 {
                conn.wait_min_turn_around();
                conn.send_snrm(None);
                conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
                conn.retry_count += 1;
            } else {
                warn!(retries = conn.retry_count, "reset not acknowledged");
                conn.link_down(DisconnectReason::NoResponse);
            }
            Outcome::Done
        }

        // Both ends reset at once. The larger address stays primary.
        Event::Frame(Frame {
            kind: FrameKind::Snrm(snrm @ Snrm { qos: None, .. }),
            ..
        }) => {
            if snrm.source > conn.config.address {
                debug!(peer = %snrm.source, "reset collision, becoming secondary");
                conn.cancel_timer(TimerKind::Final);
                conn.initiate_connection_state();
                conn.wait_min_turn_around();
                conn.role = Role::Secondary;
                conn.send_ua(None);
                conn.emit(LinkEvent::ResetConfirm);
                conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
                conn.next_state(LinkState::NrmS);
            }
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::Disc | FrameKind::DisconnectMode,
            ..
        }) => {
            conn.link_down(DisconnectReason::ResetIndication);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// RESET_CHECK: the primary asked for a reset, the upper layer decides.
pub(super) fn reset_check(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::ResetResponse => {
            conn.initiate_connection_state();
            conn.flush_queues();
            conn.wait_min_turn_around();
            conn.send_ua(None);
            conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
            conn.next_state(LinkState::NrmS);
            Outcome::Done
        }

        Event::DisconnectRequest => {
            conn.wait_min_turn_around();
            conn.send_rd();
            conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
            conn.next_state(LinkState::SClose);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}
