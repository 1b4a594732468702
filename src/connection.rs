//! The IrLAP session object.
//!
//! A [`Connection`] is a sans-IO state machine. The owner feeds it service
//! requests, received frames and the current time, then drains what it wants
//! sent with [`Connection::poll_transmit`] and what it wants reported with
//! [`Connection::poll_event`]. [`Connection::poll_timeout`] tells the owner
//! when to call [`Connection::handle_timeout`] next.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::config::LinkConfig;
use crate::core::{
    BACKOFF_MIN, BACKOFF_SPREAD_MS, BROADCAST_CONNECTION_ADDRESS, ConfigError, DEFAULT_BAUD_RATE,
    LinkError, LinkResult, MAX_CONNECTION_ADDRESS, MIN_CONNECTION_ADDRESS, VALID_SLOT_COUNTS,
};
use crate::discovery::DiscoverySession;
use crate::event::{DisconnectReason, LinkEvent};
use crate::frame::{
    DeviceAddress, DiscoveryInfo, Frame, FrameKind, Role, Snrm, Supervisory, Ua, Xid,
};
use crate::qos::{LinkTiming, QosParams};
use crate::sequence::{SentFrame, WindowTracker};
use crate::state::{Event, LinkState};
use crate::timer::{TimerKind, TimerSet};

/// A frame ready to go on the air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    /// The frame.
    pub frame: Frame,
    /// Quiet time to leave on the medium before sending.
    pub min_turnaround: Duration,
    /// Baud rate to send at.
    pub speed: u32,
}

/// A service data unit waiting for the transmit turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueuedFrame {
    pub payload: Vec<u8>,
    /// Sent as UI instead of I.
    pub unreliable: bool,
}

/// One IrLAP station and its (at most one) link.
#[derive(Debug)]
pub struct Connection {
    pub(crate) config: LinkConfig,
    pub(crate) state: LinkState,
    pub(crate) role: Role,
    pub(crate) peer: Option<DeviceAddress>,
    pub(crate) caddr: u8,

    pub(crate) tracker: WindowTracker,
    pub(crate) retry_count: u32,
    pub(crate) remote_busy: bool,
    pub(crate) local_busy: bool,
    pub(crate) ack_required: bool,
    /// Whether we held the turn when a reset was indicated.
    pub(crate) xmitflag: bool,
    /// One-off timer extension already granted.
    pub(crate) add_wait: bool,
    pub(crate) disconnect_pending: bool,
    pub(crate) frame_reject_pending: bool,
    pub(crate) media_busy: bool,
    pub(crate) medium_receiving: bool,

    /// Parameters offered by the peer in its SNRM.
    pub(crate) peer_qos: Option<QosParams>,
    /// Parameters in force on the link.
    pub(crate) qos: QosParams,
    pub(crate) timing: LinkTiming,
    pub(crate) bytes_left: usize,
    pub(crate) tx_speed: u32,
    mtt_pending: bool,

    pub(crate) timers: TimerSet,
    pub(crate) txq: VecDeque<QueuedFrame>,
    transmits: VecDeque<Transmit>,
    events: VecDeque<LinkEvent>,
    pub(crate) discovery: DiscoverySession,
    pub(crate) rng: StdRng,
    pub(crate) now: Instant,
}

impl Connection {
    /// Create a station in NDM.
    pub fn new(config: LinkConfig) -> LinkResult<Self> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let qos = QosParams::contention();
        let timing = LinkTiming::from_qos(&qos);

        debug!(address = %config.address, "station created");

        Ok(Self {
            config,
            state: LinkState::Ndm,
            role: Role::Primary,
            peer: None,
            caddr: BROADCAST_CONNECTION_ADDRESS,
            tracker: WindowTracker::new(qos.window_size),
            retry_count: 0,
            remote_busy: false,
            local_busy: false,
            ack_required: false,
            xmitflag: false,
            add_wait: false,
            disconnect_pending: false,
            frame_reject_pending: false,
            media_busy: false,
            medium_receiving: false,
            peer_qos: None,
            qos,
            timing,
            bytes_left: timing.line_capacity,
            tx_speed: DEFAULT_BAUD_RATE,
            mtt_pending: false,
            timers: TimerSet::new(),
            txq: VecDeque::new(),
            transmits: VecDeque::new(),
            events: VecDeque::new(),
            discovery: DiscoverySession::default(),
            rng,
            now: Instant::now(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Role on the current or last link.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Our device address.
    pub fn local_address(&self) -> DeviceAddress {
        self.config.address
    }

    /// The station we are connected or connecting to.
    pub fn peer(&self) -> Option<DeviceAddress> {
        self.peer
    }

    /// Connection address in use.
    pub fn connection_address(&self) -> u8 {
        self.caddr
    }

    /// Parameters in force (contention parameters when not connected).
    pub fn qos(&self) -> &QosParams {
        &self.qos
    }

    /// Timer intervals derived from [`Connection::qos`].
    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    /// Sequence counters and retransmission queue.
    pub fn window(&self) -> &WindowTracker {
        &self.tracker
    }

    /// Data units waiting for the transmit turn.
    pub fn queued(&self) -> usize {
        self.txq.len()
    }

    /// Consecutive unanswered polls, or connect/disconnect attempts.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Check if the peer reported itself busy.
    pub fn is_remote_busy(&self) -> bool {
        self.remote_busy
    }

    /// Check if a timer is armed.
    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    // =========================================================================
    // Service requests
    // =========================================================================

    /// Connect to `peer`. Only valid in NDM.
    pub fn connect_request(&mut self, now: Instant, peer: DeviceAddress) -> LinkResult<()> {
        self.now = now;
        self.request(Event::ConnectRequest { peer })
    }

    /// Accept the connection announced by a connect indication.
    pub fn connect_response(&mut self, now: Instant) -> LinkResult<()> {
        self.now = now;
        self.request(Event::ConnectResponse)
    }

    /// Tear the link down.
    ///
    /// Queued data goes out first. When we do not hold the turn the
    /// disconnect waits for it.
    pub fn disconnect_request(&mut self, now: Instant) -> LinkResult<()> {
        self.now = now;

        match self.state {
            LinkState::XmitP | LinkState::XmitS | LinkState::NrmP | LinkState::NrmS
                if !self.txq.is_empty() =>
            {
                debug!(queued = self.txq.len(), "disconnect deferred until queue drains");
                self.disconnect_pending = true;
                Ok(())
            }
            LinkState::XmitP
            | LinkState::XmitS
            | LinkState::Conn
            | LinkState::ResetWait
            | LinkState::ResetCheck => self.request(Event::DisconnectRequest),
            LinkState::NrmP | LinkState::NrmS => {
                self.disconnect_pending = true;
                Ok(())
            }
            state => Err(LinkError::InvalidRequest {
                state,
                request: "disconnect_request",
            }),
        }
    }

    /// Discover stations in range using `slots` slots (1, 6, 8 or 16).
    pub fn discovery_request(&mut self, now: Instant, slots: u8) -> LinkResult<()> {
        if !VALID_SLOT_COUNTS.contains(&slots) {
            return Err(ConfigError::SlotCount(slots).into());
        }
        self.now = now;
        self.request(Event::DiscoveryRequest { slots })
    }

    /// Queue reliable data for the peer.
    pub fn data_request(&mut self, now: Instant, payload: Vec<u8>) -> LinkResult<()> {
        if !self.state.is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.enqueue(now, payload, false)
    }

    /// Send unreliable data.
    ///
    /// In NDM the frame is broadcast at once. On a link it is queued with the
    /// reliable data and sent as a UI frame.
    pub fn unit_data_request(&mut self, now: Instant, payload: Vec<u8>) -> LinkResult<()> {
        match self.state {
            LinkState::Ndm => {
                if self.media_busy {
                    return Err(LinkError::MediaBusy);
                }
                self.check_payload(&payload)?;
                self.now = now;
                self.send(Frame::command(
                    BROADCAST_CONNECTION_ADDRESS,
                    false,
                    FrameKind::UnitData(payload),
                ));
                Ok(())
            }
            state if state.is_connected() => self.enqueue(now, payload, true),
            _ => Err(LinkError::NotConnected),
        }
    }

    /// Start the reset the upper layer was asked for (primary side).
    pub fn reset_request(&mut self, now: Instant) -> LinkResult<()> {
        self.now = now;
        self.request(Event::ResetRequest)
    }

    /// Accept the reset the peer asked for (secondary side).
    pub fn reset_response(&mut self, now: Instant) -> LinkResult<()> {
        self.now = now;
        self.request(Event::ResetResponse)
    }

    // =========================================================================
    // Medium input
    // =========================================================================

    /// Process a received frame.
    pub fn handle_frame(&mut self, now: Instant, frame: Frame) {
        self.now = now;

        if !self.accepts(&frame) {
            return;
        }
        trace!(state = %self.state, frame = frame.name(), pf = frame.pf, "frame received");
        self.dispatch(Event::Frame(frame));
    }

    /// Deliver every timer that has expired by `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        self.now = now;

        while let Some(kind) = self.timers.pop_expired(now) {
            trace!(state = %self.state, timer = %kind, "timer expired");
            self.dispatch(Event::Timer(kind));
        }
    }

    /// Report whether another station is using the medium.
    pub fn set_media_busy(&mut self, busy: bool) {
        self.media_busy = busy;
    }

    /// Report whether a frame is currently being received.
    pub fn set_medium_receiving(&mut self, receiving: bool) {
        self.medium_receiving = receiving;
    }

    /// Tell the peer we cannot take more I frames for now.
    pub fn set_local_busy(&mut self, busy: bool) {
        self.local_busy = busy;
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Next frame to send.
    pub fn poll_transmit(&mut self) -> Option<Transmit> {
        self.transmits.pop_front()
    }

    /// Next indication for the service user.
    pub fn poll_event(&mut self) -> Option<LinkEvent> {
        self.events.pop_front()
    }

    /// When [`Connection::handle_timeout`] must be called next.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn request(&mut self, event: Event) -> LinkResult<()> {
        let request = event.name();
        if self.dispatch(event) {
            Ok(())
        } else {
            Err(LinkError::InvalidRequest {
                state: self.state,
                request,
            })
        }
    }

    fn check_payload(&self, payload: &[u8]) -> LinkResult<()> {
        if payload.len() > self.qos.data_size {
            return Err(LinkError::PayloadTooLarge {
                len: payload.len(),
                max: self.qos.data_size,
            });
        }
        Ok(())
    }

    fn enqueue(&mut self, now: Instant, payload: Vec<u8>, unreliable: bool) -> LinkResult<()> {
        self.check_payload(&payload)?;
        if self.txq.len() >= self.config.tx_queue_limit {
            return Err(LinkError::QueueFull);
        }

        self.now = now;
        self.txq.push_back(QueuedFrame {
            payload,
            unreliable,
        });
        self.drain();
        Ok(())
    }

    /// Address filtering applied before a frame reaches the state machine.
    fn accepts(&self, frame: &Frame) -> bool {
        if frame.connection_address != BROADCAST_CONNECTION_ADDRESS
            && frame.connection_address != self.caddr
        {
            trace!(caddr = frame.connection_address, "frame for another link");
            return false;
        }
        if !frame.has_valid_direction() {
            warn!(frame = frame.name(), command = frame.command, "frame with wrong C/R bit discarded");
            return false;
        }

        let local = self.config.address;
        let addressed = match &frame.kind {
            FrameKind::Snrm(snrm) => snrm.destination == local,
            FrameKind::Ua(ua) => ua.destination == local,
            FrameKind::Xid(xid) => xid.destination == local || xid.destination.is_broadcast(),
            _ => true,
        };
        if !addressed {
            trace!(frame = frame.name(), "frame for another station");
        }
        addressed
    }

    pub(crate) fn emit(&mut self, event: LinkEvent) {
        trace!(?event, "indication");
        self.events.push_back(event);
    }

    pub(crate) fn start_timer(&mut self, kind: TimerKind, timeout: Duration) {
        self.timers.start(kind, self.now, timeout);
    }

    pub(crate) fn cancel_timer(&mut self, kind: TimerKind) {
        self.timers.cancel(kind);
    }

    /// Make the next transmission honour the peer's minimum turnaround time.
    pub(crate) fn wait_min_turn_around(&mut self) {
        self.mtt_pending = true;
    }

    pub(crate) fn send(&mut self, frame: Frame) {
        let min_turnaround = if std::mem::take(&mut self.mtt_pending) {
            self.qos.min_turn_time
        } else {
            Duration::ZERO
        };
        trace!(frame = frame.name(), pf = frame.pf, speed = self.tx_speed, "frame queued for medium");
        self.transmits.push_back(Transmit {
            frame,
            min_turnaround,
            speed: self.tx_speed,
        });
    }

    fn peer_address(&self) -> DeviceAddress {
        self.peer.unwrap_or(DeviceAddress::BROADCAST)
    }

    /// Frame from our side of the link: commands as primary, responses as
    /// secondary.
    fn link_frame(&self, pf: bool, kind: FrameKind) -> Frame {
        match self.role {
            Role::Primary => Frame::command(self.caddr, pf, kind),
            Role::Secondary => Frame::response(self.caddr, pf, kind),
        }
    }

    // -------------------------------------------------------------------------
    // Unnumbered and supervisory frames
    // -------------------------------------------------------------------------

    /// Send an SNRM. With parameters it opens a link, without it resets one.
    pub(crate) fn send_snrm(&mut self, qos: Option<QosParams>) {
        let snrm = Snrm {
            source: self.config.address,
            destination: self.peer_address(),
            connection_address: self.caddr,
            qos,
        };
        let caddr = if snrm.qos.is_some() {
            BROADCAST_CONNECTION_ADDRESS
        } else {
            self.caddr
        };
        self.send(Frame::command(caddr, true, FrameKind::Snrm(snrm)));
    }

    pub(crate) fn send_ua(&mut self, qos: Option<QosParams>) {
        let ua = Ua {
            source: self.config.address,
            destination: self.peer_address(),
            qos,
        };
        self.send(Frame::response(self.caddr, true, FrameKind::Ua(ua)));
    }

    /// RR with the poll/final bit, or RNR while we are busy.
    pub(crate) fn send_rr(&mut self) {
        if self.local_busy {
            return self.send_rnr();
        }
        let frame = self.link_frame(
            true,
            FrameKind::Supervisory {
                kind: Supervisory::ReceiveReady,
                nr: self.tracker.vr(),
            },
        );
        self.send(frame);
    }

    pub(crate) fn send_rnr(&mut self) {
        let frame = self.link_frame(
            true,
            FrameKind::Supervisory {
                kind: Supervisory::ReceiveNotReady,
                nr: self.tracker.vr(),
            },
        );
        self.send(frame);
    }

    pub(crate) fn send_disc(&mut self) {
        self.send(Frame::command(self.caddr, true, FrameKind::Disc));
    }

    pub(crate) fn send_rd(&mut self) {
        self.send(Frame::response(self.caddr, true, FrameKind::RequestDisconnect));
    }

    pub(crate) fn send_dm(&mut self) {
        self.send(Frame::response(self.caddr, true, FrameKind::DisconnectMode));
    }

    pub(crate) fn send_frmr(&mut self) {
        self.send(Frame::response(self.caddr, true, FrameKind::FrameReject));
    }

    pub(crate) fn local_discovery_info(&self) -> DiscoveryInfo {
        DiscoveryInfo {
            address: self.config.address,
            hints: self.config.hints,
            nickname: self.config.nickname.clone(),
        }
    }

    /// Send a discovery XID, as the discovering station (`command`) or as an
    /// answer to `destination`.
    pub(crate) fn send_discovery_xid(
        &mut self,
        slots: u8,
        slot: u8,
        command: bool,
        destination: DeviceAddress,
    ) {
        let xid = Xid {
            source: self.config.address,
            destination,
            slots,
            slot,
            info: Some(self.local_discovery_info()),
        };
        let frame = if command {
            Frame::command(BROADCAST_CONNECTION_ADDRESS, true, FrameKind::Xid(xid))
        } else {
            Frame::response(BROADCAST_CONNECTION_ADDRESS, true, FrameKind::Xid(xid))
        };
        self.send(frame);
    }

    // -------------------------------------------------------------------------
    // Data frames
    // -------------------------------------------------------------------------

    fn send_info(&mut self, ns: u8, payload: Vec<u8>, pf: bool) {
        let nr = self.tracker.vr();
        let frame = self.link_frame(pf, FrameKind::Info { ns, nr, payload });
        self.send(frame);
    }

    fn send_ui(&mut self, payload: Vec<u8>, pf: bool) {
        let frame = self.link_frame(pf, FrameKind::UnitData(payload));
        self.send(frame);
    }

    /// Send a queued frame and keep the turn.
    pub(crate) fn send_data(&mut self, frame: QueuedFrame) {
        if frame.unreliable {
            self.send_ui(frame.payload, false);
            self.tracker.consume_credit();
        } else {
            let ns = self.tracker.record_sent(frame.payload.clone());
            self.ack_required = false;
            self.send_info(ns, frame.payload, false);
        }
    }

    /// Send a queued frame with the poll/final bit, handing over the turn.
    fn send_data_final(&mut self, frame: QueuedFrame) {
        if frame.unreliable {
            if self.ack_required {
                self.send_ui(frame.payload, false);
                self.send_rr();
                self.ack_required = false;
            } else {
                self.send_ui(frame.payload, true);
            }
        } else {
            let ns = self.tracker.record_sent(frame.payload.clone());
            self.ack_required = false;
            self.send_info(ns, frame.payload, true);
        }
        self.tracker.refill_window();
        self.bytes_left = self.timing.line_capacity;
    }

    /// Primary: send with the poll bit, arm the final timer, wait in NRM_P.
    pub(crate) fn send_data_primary_poll(&mut self, frame: QueuedFrame) {
        self.cancel_timer(TimerKind::Poll);
        self.send_data_final(frame);
        self.start_timer(TimerKind::Final, self.timing.final_timeout);
        self.next_state(LinkState::NrmP);
    }

    /// Secondary: send with the final bit, arm the watchdog, wait in NRM_S.
    pub(crate) fn send_data_secondary_final(&mut self, frame: QueuedFrame) {
        self.send_data_final(frame);
        self.start_timer(TimerKind::Watchdog, self.timing.watchdog_timeout);
        self.next_state(LinkState::NrmS);
    }

    /// Go-back-N: resend every unacknowledged frame, oldest first, with the
    /// poll/final bit on the last one.
    pub(crate) fn resend_rejected(&mut self) {
        let frames: Vec<SentFrame> = self.tracker.unacked().cloned().collect();
        let Some(last) = frames.len().checked_sub(1) else {
            self.send_rr();
            return;
        };

        debug!(count = frames.len(), from = frames[0].ns, "retransmitting window");
        for (i, sent) in frames.into_iter().enumerate() {
            self.send_info(sent.ns, sent.payload, i == last);
        }
        self.ack_required = false;
    }

    /// Resend only the frame numbered `ns`.
    pub(crate) fn resend_one(&mut self, ns: u8) {
        let sent = self.tracker.unacked().find(|f| f.ns == ns).cloned();
        match sent {
            Some(sent) => {
                debug!(ns, "retransmitting selectively rejected frame");
                self.send_info(sent.ns, sent.payload, true);
                self.ack_required = false;
            }
            None => self.send_rr(),
        }
    }

    // -------------------------------------------------------------------------
    // Link lifecycle
    // -------------------------------------------------------------------------

    /// Pick a fresh connection address for a link we open.
    pub(crate) fn generate_caddr(&mut self) -> u8 {
        self.rng.gen_range(MIN_CONNECTION_ADDRESS..=MAX_CONNECTION_ADDRESS)
    }

    pub(crate) fn random_backoff(&mut self) -> Duration {
        BACKOFF_MIN + Duration::from_millis(self.rng.gen_range(0..BACKOFF_SPREAD_MS))
    }

    /// Negotiate our capabilities against the peer's.
    pub(crate) fn negotiate(&mut self, peer: Option<QosParams>) {
        let ours = self.config.qos;
        let peer = peer.unwrap_or(ours);
        if let Err(err) = peer.validate() {
            warn!(%err, "peer parameters out of range, using contention values");
        }
        self.qos = ours.negotiate(&peer);
        self.timing = LinkTiming::from_qos(&self.qos);
        debug!(
            baud = self.qos.baud_rate,
            window = self.qos.window_size,
            data_size = self.qos.data_size,
            "link parameters negotiated"
        );
    }

    /// Put the sequence state in its initial position.
    pub(crate) fn initiate_connection_state(&mut self) {
        self.tracker.reset(self.qos.window_size);
        self.remote_busy = false;
        self.retry_count = 0;
        self.ack_required = false;
        self.add_wait = false;
        self.frame_reject_pending = false;
    }

    /// Switch to the negotiated speed and turn budget.
    pub(crate) fn apply_connection_parameters(&mut self) {
        self.tx_speed = self.qos.baud_rate;
        self.bytes_left = self.timing.line_capacity;
    }

    /// Fall back to contention-mode parameters.
    pub(crate) fn apply_default_connection_parameters(&mut self) {
        self.qos = QosParams::contention();
        self.timing = LinkTiming::from_qos(&self.qos);
        self.tx_speed = DEFAULT_BAUD_RATE;
        self.bytes_left = self.timing.line_capacity;
        self.caddr = BROADCAST_CONNECTION_ADDRESS;
        self.tracker.reset(self.qos.window_size);
    }

    pub(crate) fn flush_queues(&mut self) {
        self.txq.clear();
        self.tracker.clear();
    }

    /// Leave the link and report why.
    pub(crate) fn link_down(&mut self, reason: DisconnectReason) {
        match reason {
            DisconnectReason::NoResponse | DisconnectReason::ResetIndication => {
                warn!(peer = ?self.peer, ?reason, "link lost")
            }
            _ => debug!(peer = ?self.peer, ?reason, "link closed"),
        }
        self.flush_queues();
        self.apply_default_connection_parameters();
        self.disconnect_pending = false;
        self.frame_reject_pending = false;
        self.remote_busy = false;
        self.next_state(LinkState::Ndm);
        self.emit(LinkEvent::DisconnectIndication(reason));
    }

    /// Primary: send DISC and wait for it to be acknowledged in PCLOSE.
    pub(crate) fn primary_disconnect(&mut self) {
        self.wait_min_turn_around();
        self.send_disc();
        self.flush_queues();
        self.disconnect_pending = false;
        self.retry_count = 0;
        self.start_timer(TimerKind::Final, self.timing.final_timeout);
        self.next_state(LinkState::PClose);
    }

    /// Secondary: the peer gave us the turn and we have no data for it.
    ///
    /// A pending frame reject goes first, then a pending disconnect, else a
    /// plain RR.
    pub(crate) fn secondary_answer_poll(&mut self) {
        self.wait_min_turn_around();
        self.ack_required = false;

        if self.frame_reject_pending {
            self.frame_reject_pending = false;
            warn!(vr = self.tracker.vr(), vs = self.tracker.vs(), "rejecting frame sequence");
            self.send_frmr();
            self.start_timer(TimerKind::Watchdog, self.timing.watchdog_timeout);
        } else if self.disconnect_pending {
            self.disconnect_pending = false;
            self.send_rd();
            self.flush_queues();
            self.start_timer(TimerKind::Watchdog, self.timing.watchdog_timeout);
            self.next_state(LinkState::SClose);
        } else {
            self.send_rr();
            self.start_timer(TimerKind::Watchdog, self.timing.watchdog_timeout);
        }
    }

    /// Check if the secondary has something it may send right now.
    pub(crate) fn secondary_can_send(&self) -> bool {
        !self.txq.is_empty() && self.tracker.window() > 0 && !self.remote_busy
    }

    /// Secondary: we were polled. Send queued data or answer the poll.
    pub(crate) fn secondary_take_turn(&mut self) {
        if !self.frame_reject_pending && self.secondary_can_send() {
            self.wait_min_turn_around();
            self.ack_required = true;
            self.next_state(LinkState::XmitS);
        } else {
            self.secondary_answer_poll();
        }
    }
}
