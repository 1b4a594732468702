//! Sequence numbers and the transmit window.
//!
//! `vs` is the next Ns we will send, `vr` the next Ns we expect to receive and
//! `va` the Ns of the oldest frame the peer has not acknowledged yet. All three
//! are modulo-8 counters.

use std::collections::VecDeque;

use crate::core::SEQ_MODULUS;

/// Classification of a received sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqStatus {
    /// Exactly the value we were waiting for.
    Expected,
    /// Stale or ahead, but recoverable by retransmission.
    Unexpected,
    /// Impossible under the current window. Forces a reset.
    Invalid,
}

/// Distance from `from` forward to `to`, modulo 8.
pub fn seq_distance(from: u8, to: u8) -> u8 {
    to.wrapping_sub(from) % SEQ_MODULUS
}

/// Classify a received Nr against our send state.
///
/// The peer acknowledges everything we sent when `nr == vs`. Any value in
/// `[va, vs)` acknowledges part of the window and asks for the rest again.
/// Everything else refers to frames we never sent.
pub fn classify_nr(nr: u8, va: u8, vs: u8) -> SeqStatus {
    if nr >= SEQ_MODULUS {
        return SeqStatus::Invalid;
    }
    if nr == vs {
        return SeqStatus::Expected;
    }
    if seq_distance(va, nr) < seq_distance(va, vs) {
        SeqStatus::Unexpected
    } else {
        SeqStatus::Invalid
    }
}

/// Classify a received Ns against our receive state.
///
/// A frame up to `window` positions behind `vr` is a duplicate and a frame
/// less than `window` ahead follows a loss. Both are recoverable.
pub fn classify_ns(ns: u8, vr: u8, window: u8) -> SeqStatus {
    if ns >= SEQ_MODULUS {
        return SeqStatus::Invalid;
    }
    if ns == vr {
        return SeqStatus::Expected;
    }
    let ahead = seq_distance(vr, ns);
    if ahead < window || SEQ_MODULUS - ahead <= window {
        SeqStatus::Unexpected
    } else {
        SeqStatus::Invalid
    }
}

/// An I frame kept for retransmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    /// Ns it was sent with.
    pub ns: u8,
    /// Information field.
    pub payload: Vec<u8>,
}

/// Send/receive counters and the retransmission queue.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    vs: u8,
    vr: u8,
    va: u8,
    window: u8,
    window_size: u8,
    unacked: VecDeque<SentFrame>,
}

impl WindowTracker {
    /// Fresh tracker with all counters at zero.
    pub fn new(window_size: u8) -> Self {
        Self {
            vs: 0,
            vr: 0,
            va: 0,
            window: window_size,
            window_size,
            unacked: VecDeque::with_capacity(window_size as usize),
        }
    }

    /// Full re-initialization, dropping every unacknowledged frame.
    pub fn reset(&mut self, window_size: u8) {
        *self = Self::new(window_size);
    }

    /// Next Ns to send.
    pub fn vs(&self) -> u8 {
        self.vs
    }

    /// Next Ns expected from the peer.
    pub fn vr(&self) -> u8 {
        self.vr
    }

    /// Oldest unacknowledged Ns.
    pub fn va(&self) -> u8 {
        self.va
    }

    /// Frames we may still send this turn.
    pub fn window(&self) -> u8 {
        self.window
    }

    /// Negotiated window size.
    pub fn window_size(&self) -> u8 {
        self.window_size
    }

    /// Frames waiting for acknowledgment, oldest first.
    pub fn unacked(&self) -> impl Iterator<Item = &SentFrame> {
        self.unacked.iter()
    }

    /// Number of frames waiting for acknowledgment.
    pub fn unacked_len(&self) -> usize {
        self.unacked.len()
    }

    /// Classify a received Nr.
    pub fn classify_nr(&self, nr: u8) -> SeqStatus {
        classify_nr(nr, self.va, self.vs)
    }

    /// Classify a received Ns.
    pub fn classify_ns(&self, ns: u8) -> SeqStatus {
        classify_ns(ns, self.vr, self.window_size)
    }

    /// Store an outgoing I frame and return the Ns it must carry.
    pub fn record_sent(&mut self, payload: Vec<u8>) -> u8 {
        let ns = self.vs;
        self.unacked.push_back(SentFrame { ns, payload });
        self.vs = (self.vs + 1) % SEQ_MODULUS;
        self.consume_credit();
        ns
    }

    /// Use one window credit without storing a frame (UI frames).
    pub fn consume_credit(&mut self) {
        self.window = self.window.saturating_sub(1);
    }

    /// Give the full window back at the start of a new turn.
    pub fn refill_window(&mut self) {
        self.window = self.window_size;
    }

    /// Accept the next in-sequence frame from the peer.
    pub fn advance_vr(&mut self) {
        self.vr = (self.vr + 1) % SEQ_MODULUS;
    }

    /// Release every frame acknowledged by `nr` and advance `va`.
    ///
    /// An `nr` that would release more frames than are outstanding is ignored,
    /// so replaying an old acknowledgment is harmless. Returns the number of
    /// frames released.
    pub fn ack_through(&mut self, nr: u8) -> usize {
        let count = seq_distance(self.va, nr) as usize;
        if count > self.unacked.len() {
            return 0;
        }
        self.unacked.drain(..count);
        self.va = nr % SEQ_MODULUS;
        self.window = self
            .window_size
            .saturating_sub(self.unacked.len() as u8);
        count
    }

    /// Drop every unacknowledged frame without touching the counters.
    pub fn clear(&mut self) {
        self.unacked.clear();
    }
}
