//! Protocol timers.
//!
//! Each connection owns five single-shot timers. A timer is an
//! `Option<ArmedTimer>` slot: re-arming replaces the slot and cancelling
//! drops it, so a dropped timer can never be delivered.
//!
//! Timers are stamped with the dispatch epoch in which they were armed. When
//! a handler moves the connection to a new state, every timer armed in an
//! earlier epoch is dropped. Leaving a state therefore always disarms the
//! timers that state started, without the handler having to remember to.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::trace;

/// The five protocol timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Primary waits for the secondary's final frame.
    Final,
    /// Primary holds the turn without data and must poll again.
    Poll,
    /// Secondary has not been polled for too long.
    Watchdog,
    /// Discovery slot (QUERY) or end of discovery (REPLY).
    Slot,
    /// Randomized delay before a connect retry.
    Backoff,
}

impl TimerKind {
    /// Every timer kind, in slot order.
    pub const ALL: [TimerKind; 5] = [
        TimerKind::Final,
        TimerKind::Poll,
        TimerKind::Watchdog,
        TimerKind::Slot,
        TimerKind::Backoff,
    ];

    fn index(self) -> usize {
        match self {
            TimerKind::Final => 0,
            TimerKind::Poll => 1,
            TimerKind::Watchdog => 2,
            TimerKind::Slot => 3,
            TimerKind::Backoff => 4,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerKind::Final => "final",
            TimerKind::Poll => "poll",
            TimerKind::Watchdog => "watchdog",
            TimerKind::Slot => "slot",
            TimerKind::Backoff => "backoff",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    deadline: Instant,
    epoch: u64,
}

/// The set of timers owned by one connection.
#[derive(Debug, Default)]
pub struct TimerSet {
    slots: [Option<ArmedTimer>; 5],
    epoch: u64,
}

impl TimerSet {
    /// Create a set with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to expire `timeout` after `now`, replacing any earlier arming.
    pub fn start(&mut self, kind: TimerKind, now: Instant, timeout: Duration) {
        trace!(timer = %kind, ?timeout, "timer armed");
        self.slots[kind.index()] = Some(ArmedTimer {
            deadline: now + timeout,
            epoch: self.epoch,
        });
    }

    /// Cancel `kind`. Cancelling a timer that is not armed does nothing.
    ///
    /// Returns whether the timer was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.slots[kind.index()].take().is_some()
    }

    /// Cancel everything.
    pub fn cancel_all(&mut self) {
        self.slots = Default::default();
    }

    /// Check if `kind` is armed.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    /// Deadline of `kind`, if armed.
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.slots[kind.index()].map(|t| t.deadline)
    }

    /// Earliest deadline over all armed timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().flatten().map(|t| t.deadline).min()
    }

    /// Remove and return the earliest timer whose deadline has passed.
    ///
    /// Each arming is returned at most once.
    pub fn pop_expired(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .into_iter()
            .filter_map(|kind| {
                self.slots[kind.index()]
                    .filter(|t| t.deadline <= now)
                    .map(|t| (t.deadline, kind))
            })
            .min_by_key(|(deadline, _)| *deadline)
            .map(|(_, kind)| kind)?;

        self.slots[kind.index()] = None;
        Some(kind)
    }

    /// Start a new dispatch epoch.
    pub(crate) fn begin_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Drop every timer armed before the current epoch.
    pub(crate) fn disarm_stale(&mut self) {
        let epoch = self.epoch;
        for kind in TimerKind::ALL {
            let slot = &mut self.slots[kind.index()];
            if slot.is_some_and(|t| t.epoch != epoch) {
                trace!(timer = %kind, "stale timer disarmed");
                *slot = None;
            }
        }
    }
}
