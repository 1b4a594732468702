//! XMIT_P, NRM_P and PCLOSE: the primary side of an established link.

use tracing::{debug, warn};

use super::{Event, LinkState, Outcome};
use crate::connection::Connection;
use crate::core::FINAL_RECEIVE_EXTENSION;
use crate::event::{DisconnectReason, LinkEvent, StatusCode};
use crate::frame::{Frame, FrameKind, Supervisory};
use crate::sequence::SeqStatus;
use crate::timer::TimerKind;

/// XMIT_P: we hold the turn.
pub(super) fn xmit(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::SendNext(frame) => {
            if conn.tracker.window() == 0 || conn.remote_busy {
                return Outcome::Requeue(frame);
            }

            let len = frame.payload.len();
            let next_fits = conn
                .txq
                .front()
                .is_some_and(|next| next.payload.len() + len <= conn.bytes_left);
            if !next_fits && len > conn.bytes_left {
                return Outcome::Requeue(frame);
            }
            conn.bytes_left = conn.bytes_left.saturating_sub(len);

            if conn.tracker.window() > 1 && next_fits {
                conn.send_data(frame);
            } else {
                conn.send_data_primary_poll(frame);
            }
            Outcome::Done
        }

        Event::Timer(TimerKind::Poll) => {
            conn.send_rr();
            conn.tracker.refill_window();
            conn.bytes_left = conn.timing.line_capacity;
            conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
            conn.next_state(LinkState::NrmP);
            Outcome::Done
        }

        Event::DisconnectRequest => {
            conn.cancel_timer(TimerKind::Poll);
            conn.primary_disconnect();
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// NRM_P: we gave the secondary the turn and wait for its final frame.
pub(super) fn nrm(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::Frame(Frame {
            command: false,
            pf,
            kind: FrameKind::Info { ns, nr, payload },
            ..
        }) => {
            receive_info(conn, ns, nr, pf, payload);
            Outcome::Done
        }

        Event::Frame(Frame {
            command: false,
            pf,
            kind: FrameKind::UnitData(payload),
            ..
        }) => {
            if pf {
                conn.cancel_timer(TimerKind::Final);
                conn.emit(LinkEvent::UnitDataIndication(payload));
                take_turn(conn);
            } else {
                conn.emit(LinkEvent::UnitDataIndication(payload));
            }
            Outcome::Done
        }

        Event::Frame(Frame {
            command: false,
            kind: FrameKind::Supervisory { kind, nr },
            ..
        }) => {
            receive_supervisory(conn, kind, nr);
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::FrameReject,
            ..
        }) => {
            warn!(vs = conn.tracker.vs(), vr = conn.tracker.vr(), "frame rejected by secondary");
            enter_reset_wait(conn, true);
            Outcome::Done
        }

        Event::Frame(Frame {
            kind: FrameKind::RequestDisconnect,
            ..
        }) => {
            debug!("secondary requested disconnect");
            conn.flush_queues();
            conn.primary_disconnect();
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

        Event::Frame(Frame {
            kind: FrameKind::DisconnectMode,
            ..
        }) => {
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        Event::Timer(TimerKind::Final) => {
            final_expired(conn);
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// PCLOSE: our DISC is outstanding.
pub(super) fn pclose(conn: &mut Connection, event: Event) -> Outcome {
    match event {
        Event::Frame(Frame {
            kind: FrameKind::Ua(_) | FrameKind::DisconnectMode,
            ..
        }) => {
            conn.link_down(DisconnectReason::PeerDisconnect);
            Outcome::Done
        }

        Event::Timer(TimerKind::Final) => {
            if conn.retry_count < conn.config.n3 {
                conn.wait_min_turn_around();
                conn.send_disc();
                conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
                conn.retry_count += 1;
            } else {
                conn.link_down(DisconnectReason::NoResponse);
            }
            Outcome::Done
        }

        other => Outcome::Unhandled(other),
    }
}

/// The secondary handed the turn back.
pub(super) fn take_turn(conn: &mut Connection) {
    conn.wait_min_turn_around();
    conn.start_timer(TimerKind::Poll, conn.timing.poll_timeout);
    conn.next_state(LinkState::XmitP);
}

fn enter_reset_wait(conn: &mut Connection, xmitflag: bool) {
    conn.cancel_timer(TimerKind::Final);
    conn.xmitflag = xmitflag;
    conn.next_state(LinkState::ResetWait);
    conn.emit(LinkEvent::ResetIndication);
}

fn receive_info(conn: &mut Connection, ns: u8, nr: u8, pf: bool, payload: Vec<u8>) {
    let ns_status = conn.tracker.classify_ns(ns);
    let nr_status = conn.tracker.classify_nr(nr);

    match (ns_status, nr_status) {
        (SeqStatus::Invalid, _) | (_, SeqStatus::Invalid) => {
            warn!(ns, nr, ?ns_status, ?nr_status, "invalid sequence numbers");
            enter_reset_wait(conn, pf);
        }

        (SeqStatus::Expected, SeqStatus::Expected) => {
            conn.tracker.advance_vr();
            conn.tracker.ack_through(nr);
            conn.retry_count = 0;
            conn.ack_required = true;
            if pf {
                conn.cancel_timer(TimerKind::Final);
                conn.emit(LinkEvent::DataIndication(payload));
                take_turn(conn);
            } else {
                conn.emit(LinkEvent::DataIndication(payload));
            }
        }

        (SeqStatus::Unexpected, SeqStatus::Expected) => {
            debug!(ns, vr = conn.tracker.vr(), "missing or duplicate frame");
            conn.tracker.ack_through(nr);
            if pf {
                conn.wait_min_turn_around();
                conn.send_rr();
                conn.ack_required = false;
                conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
            }
        }

        (SeqStatus::Expected, SeqStatus::Unexpected) => {
            conn.tracker.advance_vr();
            conn.tracker.ack_through(nr);
            if pf {
                conn.resend_rejected();
                conn.start_timer(TimerKind::Final, conn.timing.final_timeout * 2);
            } else {
                conn.ack_required = true;
            }
            conn.emit(LinkEvent::DataIndication(payload));
        }

        (SeqStatus::Unexpected, SeqStatus::Unexpected) => {
            conn.tracker.ack_through(nr);
            if pf {
                conn.resend_rejected();
                conn.start_timer(TimerKind::Final, conn.timing.final_timeout);
            }
        }
    }
}

fn receive_supervisory(conn: &mut Connection, kind: Supervisory, nr: u8) {
    let nr_status = conn.tracker.classify_nr(nr);
    if nr_status == SeqStatus::Invalid {
        warn!(nr, va = conn.tracker.va(), vs = conn.tracker.vs(), "invalid nr");
        enter_reset_wait(conn, true);
        return;
    }

    match kind {
        Supervisory::ReceiveReady => {
            conn.remote_busy = false;
            conn.cancel_timer(TimerKind::Final);
            conn.tracker.ack_through(nr);
            conn.retry_count = 0;

            if nr_status == SeqStatus::Expected {
                take_turn(conn);
            } else {
                conn.resend_rejected();
                conn.start_timer(TimerKind::Final, conn.timing.final_timeout * 2);
            }
        }

        Supervisory::ReceiveNotReady => {
            debug!("secondary busy");
            conn.remote_busy = true;
            conn.cancel_timer(TimerKind::Final);
            conn.tracker.ack_through(nr);
            conn.retry_count = 0;
            take_turn(conn);
        }

        Supervisory::Reject | Supervisory::SelectiveReject => {
            conn.cancel_timer(TimerKind::Final);
            conn.tracker.ack_through(nr);
            if conn.remote_busy {
                conn.wait_min_turn_around();
                conn.send_rr();
            } else if kind == Supervisory::Reject {
                conn.resend_rejected();
            } else {
                conn.resend_one(nr);
            }
            conn.start_timer(TimerKind::Final, conn.timing.final_timeout * 2);
        }
    }
}

fn final_expired(conn: &mut Connection) {
    if conn.medium_receiving && !conn.add_wait {
        debug!("final timer extended while receiving");
        conn.start_timer(TimerKind::Final, FINAL_RECEIVE_EXTENSION);
        conn.add_wait = true;
        return;
    }
    conn.add_wait = false;

    conn.retry_count += 1;
    if conn.retry_count < conn.config.n2 {
        if conn.tracker.unacked_len() == 0 {
            conn.wait_min_turn_around();
            conn.send_rr();
        } else {
            conn.resend_rejected();
        }
        conn.start_timer(TimerKind::Final, conn.timing.final_timeout);

        if conn.retry_count % conn.config.n1 == 0 {
            warn!(retries = conn.retry_count, "no answer from secondary");
            conn.emit(LinkEvent::StatusIndication(StatusCode::NoActivity));
        }
    } else {
        conn.link_down(DisconnectReason::NoResponse);
    }
}
