//! The link state machine.
//!
//! Every state has one handler, selected by matching on [`LinkState`]. A
//! handler consumes one [`Event`] and reports whether it used it. The
//! dispatcher then drains the transmit queue while the connection holds the
//! transmit turn.

use std::fmt;

use tracing::{debug, trace};

use crate::connection::{Connection, QueuedFrame};
use crate::core::MAX_DRAIN_ITERATIONS;
use crate::frame::{DeviceAddress, Frame};
use crate::timer::TimerKind;

mod connect;
mod discovery;
mod ndm;
mod primary;
mod reset;
mod secondary;

#[cfg(test)]
pub(crate) mod testing;

/// The fourteen IrLAP states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Normal disconnected mode.
    Ndm,
    /// Running a discovery.
    Query,
    /// Answering another station's discovery.
    Reply,
    /// A peer asked to connect, waiting for the upper layer.
    Conn,
    /// Our connect request is outstanding.
    Setup,
    /// Primary holds the turn.
    XmitP,
    /// Primary waits for the secondary's final frame.
    NrmP,
    /// Primary is disconnecting.
    PClose,
    /// Primary waits for the upper layer to start a reset.
    ResetWait,
    /// Primary reset is outstanding.
    Reset,
    /// Secondary holds the turn.
    XmitS,
    /// Secondary waits to be polled.
    NrmS,
    /// Secondary is disconnecting.
    SClose,
    /// Secondary waits for the upper layer to accept a reset.
    ResetCheck,
}

impl LinkState {
    /// Check if this is one of the two transmit states.
    pub fn is_transmit(&self) -> bool {
        matches!(self, LinkState::XmitP | LinkState::XmitS)
    }

    /// Check if a link is up and carrying data.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            LinkState::XmitP | LinkState::NrmP | LinkState::XmitS | LinkState::NrmS
        )
    }

    /// Conventional state name.
    pub fn name(&self) -> &'static str {
        match self {
            LinkState::Ndm => "NDM",
            LinkState::Query => "QUERY",
            LinkState::Reply => "REPLY",
            LinkState::Conn => "CONN",
            LinkState::Setup => "SETUP",
            LinkState::XmitP => "XMIT_P",
            LinkState::NrmP => "NRM_P",
            LinkState::PClose => "PCLOSE",
            LinkState::ResetWait => "RESET_WAIT",
            LinkState::Reset => "RESET",
            LinkState::XmitS => "XMIT_S",
            LinkState::NrmS => "NRM_S",
            LinkState::SClose => "SCLOSE",
            LinkState::ResetCheck => "RESET_CHECK",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input to a state handler.
#[derive(Debug)]
pub(crate) enum Event {
    ConnectRequest { peer: DeviceAddress },
    ConnectResponse,
    DisconnectRequest,
    DiscoveryRequest { slots: u8 },
    ResetRequest,
    ResetResponse,
    /// Synthetic: send the frame at the head of the transmit queue.
    SendNext(QueuedFrame),
    Frame(Frame),
    Timer(TimerKind),
}

impl Event {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Event::ConnectRequest { .. } => "connect_request",
            Event::ConnectResponse => "connect_response",
            Event::DisconnectRequest => "disconnect_request",
            Event::DiscoveryRequest { .. } => "discovery_request",
            Event::ResetRequest => "reset_request",
            Event::ResetResponse => "reset_response",
            Event::SendNext(_) => "send_next",
            Event::Frame(frame) => frame.name(),
            Event::Timer(kind) => match kind {
                TimerKind::Final => "final_timer_expired",
                TimerKind::Poll => "poll_timer_expired",
                TimerKind::Watchdog => "watchdog_timer_expired",
                TimerKind::Slot => "slot_timer_expired",
                TimerKind::Backoff => "backoff_timer_expired",
            },
        }
    }
}

/// What a handler did with its event.
#[derive(Debug)]
pub(crate) enum Outcome {
    Done,
    /// Not now: put the frame back at the head of the queue.
    Requeue(QueuedFrame),
    /// The event has no meaning in this state. It is handed back unused.
    Unhandled(Event),
}

impl Connection {
    /// Run one event through the current state, then drain the transmit
    /// queue. Returns whether the state used the event.
    pub(crate) fn dispatch(&mut self, event: Event) -> bool {
        let handled = match self.invoke(event) {
            Outcome::Done => true,
            Outcome::Requeue(frame) => {
                self.txq.push_front(frame);
                true
            }
            Outcome::Unhandled(_) => false,
        };
        self.drain();
        handled
    }

    fn invoke(&mut self, event: Event) -> Outcome {
        let before = self.state;
        let name = event.name();

        self.timers.begin_epoch();
        let outcome = match self.state {
            LinkState::Ndm => ndm::handle(self, event),
            LinkState::Query => discovery::query(self, event),
            LinkState::Reply => discovery::reply(self, event),
            LinkState::Conn => connect::conn(self, event),
            LinkState::Setup => connect::setup(self, event),
            LinkState::XmitP => primary::xmit(self, event),
            LinkState::NrmP => primary::nrm(self, event),
            LinkState::PClose => primary::pclose(self, event),
            LinkState::ResetWait => reset::reset_wait(self, event),
            LinkState::Reset => reset::reset(self, event),
            LinkState::XmitS => secondary::xmit(self, event),
            LinkState::NrmS => secondary::nrm(self, event),
            LinkState::SClose => secondary::sclose(self, event),
            LinkState::ResetCheck => reset::reset_check(self, event),
        };

        if self.state != before {
            self.timers.disarm_stale();
        }
        if matches!(outcome, Outcome::Unhandled(_)) {
            debug!(state = %before, event = name, "event ignored");
        }
        outcome
    }

    /// Send queued frames for as long as we hold the turn.
    pub(crate) fn drain(&mut self) {
        for _ in 0..MAX_DRAIN_ITERATIONS {
            if !self.state.is_transmit() {
                return;
            }
            match self.txq.pop_front() {
                Some(frame) => match self.invoke(Event::SendNext(frame)) {
                    Outcome::Done => {}
                    Outcome::Requeue(frame) | Outcome::Unhandled(Event::SendNext(frame)) => {
                        self.txq.push_front(frame);
                        return;
                    }
                    Outcome::Unhandled(_) => return,
                },
                None if self.disconnect_pending => {
                    self.disconnect_pending = false;
                    self.invoke(Event::DisconnectRequest);
                }
                None => return,
            }
        }
        trace!(queued = self.txq.len(), "drain limit reached");
    }

    pub(crate) fn next_state(&mut self, state: LinkState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "state transition");
        }
        self.state = state;
    }
}
