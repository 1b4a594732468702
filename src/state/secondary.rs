//! XMIT_S, NRM_S and SCLOSE: the secondary side of an established link.

use tracing::{debug, warn};

use super::{Event, LinkState, Outcome};
use crate::connection::Connection;
use crate::event::{DisconnectReason, LinkEvent, StatusCode};
use crate::frame::{Frame, FrameKind, Snrm, Supervisory};
use crate::sequence::SeqStatus;
use crate::timer::TimerKind;

/// XMIT_S: the primary gave us the turn.
pub(super) fn xmit(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::SendNext(frame) => {
            let len = frame.payload.len();
            let next_fits = conn
                .txq
                .front()
                .is_some_and(|next| next.payload.len() + len <= conn.bytes_left);

            let blocked = conn.tracker.window() == 0 || conn.remote_busy;
            if blocked || (!next_fits && len > conn.bytes_left) {
                // Give the turn back without data.
                conn.send_rr();
                conn.tracker.refill_window();
                conn.bytes_left = conn.timing.line_capacity;
                conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
                conn.next_state(LinkState::NrmS);
                return Outcome::Requeue(frame);
            }
            conn.bytes_left = conn.bytes_left.saturating_sub(len);

            if conn.tracker.window() > 1 && next_fits {
                conn.send_data(frame);
            } else {
                conn.send_data_secondary_final(frame);
            }
            Outcome::Done
        }

        Event::DisconnectRequest => {
            conn.send_rd();
            conn.flush_queues();
            conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
            conn.next_state(LinkState::SClose);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// NRM_S: we wait to be polled.
pub(super) fn nrm(conn: &mut Connection, event: Event) -> Outcome {
    if let Event::Frame(Frame { command: true, pf: true, .. }) = &event {
        conn.retry_count = 0;
    }

    match event {
        Event::Frame(Frame {
            command: true,
            pf,
            kind: FrameKind::Info { ns, nr, payload },
            ..
        }) => {
            receive_info(conn, ns, nr, pf, payload);
            Outcome::Done
        }

        Event::Frame(Frame {
            command: true,
            pf,
            kind: FrameKind::UnitData(payload),
            ..
        }) => {
            conn.emit(LinkEvent::UnitDataIndication(payload));
            if pf {
                conn.secondary_take_turn();
            }
            Outcome::Done
        }

        Event::Frame(Frame {
            command: true,
            pf,
            kind: FrameKind::Supervisory { kind, nr },
            ..
        }) => {
            receive_supervisory(conn, kind, nr, pf);
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::Snrm(Snrm { qos: None, .. }),
            ..
        }) => {
            warn!("primary requested a link reset");
            conn.next_state(LinkState::ResetCheck);
            conn.emit(LinkEvent::ResetIndication);
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::Disc,
            ..
        }) => {
            conn.wait_min_turn_around();
            conn.send_ua(None);
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        // Another station discovering while we are connected.
        Event::Frame(Frame {
            command: true,
            kind: FrameKind::Xid(_),
            ..
        }) => {
            conn.wait_min_turn_around();
            conn.send_rr();
            conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
            Outcome::Done
        }

        Event::Timer(TimerKind::Watchdog) => {
            watchdog_expired(conn);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// SCLOSE: we sent RD and wait for the primary's DISC.
pub(super) fn sclose(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::Frame(Frame {
            kind: FrameKind::Disc,
            ..
        }) => {
            conn.wait_min_turn_around();
            conn.send_ua(None);
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        Event::Frame(Frame { command: false, .. }) => {
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        Event::Frame(Frame { pf: true, .. }) => {
            conn.wait_min_turn_around();
            conn.send_rd();
            conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
            Outcome::Done
        }

        Event::Timer(TimerKind::Watchdog) => {
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

fn rearm_watchdog(conn: &mut Connection) {
    conn.start_timer(TimerKind::Watchdog, conn.timing.watchdog_timeout);
}

/// Sequence error: answer with FRMR now if polled, else at the next poll.
fn reject_sequence(conn: &mut Connection, ns: Option<u8>, nr: u8, pf: bool) {
    warn!(?ns, nr, vr = conn.tracker.vr(), vs = conn.tracker.vs(), "invalid sequence numbers");
    conn.frame_reject_pending = true;
    if pf {
        conn.secondary_answer_poll();
    }
}

fn receive_info(conn: &mut Connection, ns: u8, nr: u8, pf: bool, payload: Vec<u8>) {
    let ns_status = conn.tracker.classify_ns(ns);
    let nr_status = conn.tracker.classify_nr(nr);

    match (ns_status, nr_status) {
        (SeqStatus::Invalid, _) | (_, SeqStatus::Invalid) => {
            reject_sequence(conn, Some(ns), nr, pf);
        }

        (SeqStatus::Expected, SeqStatus::Expected) => {
            conn.tracker.advance_vr();
            conn.tracker.ack_through(nr);
            conn.emit(LinkEvent::DataIndication(payload));
            if pf {
                conn.secondary_take_turn();
            } else {
                conn.ack_required = true;
            }
        }

        (SeqStatus::Unexpected, SeqStatus::Expected) => {
            debug!(ns, vr = conn.tracker.vr(), "missing or duplicate frame");
            conn.tracker.ack_through(nr);
            if pf {
                conn.wait_min_turn_around();
                conn.send_rr();
                conn.ack_required = false;
            }
            rearm_watchdog(conn);
        }

        (SeqStatus::Expected, SeqStatus::Unexpected) => {
            conn.tracker.advance_vr();
            conn.tracker.ack_through(nr);
            conn.emit(LinkEvent::DataIndication(payload));
            if pf {
                conn.wait_min_turn_around();
                conn.resend_rejected();
            }
            // Without the poll bit we only wait for the primary to poll again.
            rearm_watchdog(conn);
        }

        (SeqStatus::Unexpected, SeqStatus::Unexpected) => {
            conn.tracker.ack_through(nr);
            if pf {
                conn.wait_min_turn_around();
                conn.resend_rejected();
            }
            rearm_watchdog(conn);
        }
    }
}

fn receive_supervisory(conn: &mut Connection, kind: Supervisory, nr: u8, pf: bool) {
    let nr_status = conn.tracker.classify_nr(nr);
    if nr_status == SeqStatus::Invalid {
        reject_sequence(conn, None, nr, pf);
        return;
    }
    conn.tracker.ack_through(nr);

    match kind {
        Supervisory::ReceiveReady => {
            conn.remote_busy = false;
            if !pf {
                return;
            }
            if nr_status == SeqStatus::Expected {
                conn.secondary_take_turn();
            } else {
                conn.wait_min_turn_around();
                conn.resend_rejected();
                rearm_watchdog(conn);
            }
        }

        Supervisory::ReceiveNotReady => {
            debug!("primary busy");
            conn.remote_busy = true;
            if pf {
                conn.secondary_answer_poll();
            }
        }

        Supervisory::Reject | Supervisory::SelectiveReject => {
            conn.remote_busy = false;
            if !pf {
                return;
            }
            conn.wait_min_turn_around();
            if kind == Supervisory::Reject {
                conn.resend_rejected();
            } else {
                conn.resend_one(nr);
            }
            rearm_watchdog(conn);
        }
    }
}

/// The secondary cannot presume the primary dead on a single silence. It
/// waits for half of N2, warning every half of N1.
fn watchdog_expired(conn: &mut Connection) {
    let limit = (conn.config.n2 / 2).max(1);
    let warn_every = (conn.config.n1 / 2).max(1);

    conn.retry_count += 1;
    if conn.retry_count < limit {
        rearm_watchdog(conn);
        if conn.retry_count % warn_every == 0 {
            warn!(retries = conn.retry_count, "not polled by primary");
            conn.emit(LinkEvent::StatusIndication(StatusCode::NoActivity));
        }
    } else {
        conn.link_down(DisconnectReason::NoResponse);
    }
}
