//! Tokio driver binding a [`Connection`] to a [`Medium`].
//!
//! [`LinkDriver::run`] owns the connection. It feeds it frames from the
//! inbound channel, requests from [`LinkHandle`]s and timer expiries, and
//! pushes whatever the connection wants sent onto the medium.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, trace, warn};

use crate::config::LinkConfig;
use crate::connection::Connection;
use crate::core::{LinkError, LinkResult, Medium};
use crate::event::LinkEvent;
use crate::frame::{DeviceAddress, Frame};
use crate::state::LinkState;

/// A service request travelling from a [`LinkHandle`] to the driver.
#[derive(Debug)]
enum Request {
    Connect(DeviceAddress),
    ConnectResponse,
    Disconnect,
    Discovery(u8),
    Data(Vec<u8>),
    UnitData(Vec<u8>),
    Reset,
    ResetResponse,
    LocalBusy(bool),
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Request::Connect(_) => "connect",
            Request::ConnectResponse => "connect_response",
            Request::Disconnect => "disconnect",
            Request::Discovery(_) => "discovery",
            Request::Data(_) => "data",
            Request::UnitData(_) => "unit_data",
            Request::Reset => "reset",
            Request::ResetResponse => "reset_response",
            Request::LocalBusy(_) => "local_busy",
        }
    }
}

type Envelope = (Request, oneshot::Sender<LinkResult<()>>);

/// Cloneable handle for issuing service requests to a running driver.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl LinkHandle {
    async fn call(&self, request: Request) -> LinkResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .map_err(|_| LinkError::ChannelClosed)?;
        reply_rx.await.map_err(|_| LinkError::ChannelClosed)?
    }

    /// Connect to `peer`.
    pub async fn connect(&self, peer: DeviceAddress) -> LinkResult<()> {
        self.call(Request::Connect(peer)).await
    }

    /// Accept an indicated connection.
    pub async fn accept(&self) -> LinkResult<()> {
        self.call(Request::ConnectResponse).await
    }

    /// Disconnect once queued data is out.
    pub async fn disconnect(&self) -> LinkResult<()> {
        self.call(Request::Disconnect).await
    }

    /// Run a discovery with `slots` slots.
    pub async fn discover(&self, slots: u8) -> LinkResult<()> {
        self.call(Request::Discovery(slots)).await
    }

    /// Queue reliable data.
    pub async fn send(&self, payload: Vec<u8>) -> LinkResult<()> {
        self.call(Request::Data(payload)).await
    }

    /// Send unreliable data.
    pub async fn send_unreliable(&self, payload: Vec<u8>) -> LinkResult<()> {
        self.call(Request::UnitData(payload)).await
    }

    /// Start a reset after a reset indication.
    pub async fn reset(&self) -> LinkResult<()> {
        self.call(Request::Reset).await
    }

    /// Accept a reset the peer asked for.
    pub async fn accept_reset(&self) -> LinkResult<()> {
        self.call(Request::ResetResponse).await
    }

    /// Set or clear local busy.
    pub async fn set_local_busy(&self, busy: bool) -> LinkResult<()> {
        self.call(Request::LocalBusy(busy)).await
    }
}

/// Runs one station on a medium.
pub struct LinkDriver<M> {
    conn: Connection,
    medium: M,
    requests: mpsc::UnboundedReceiver<Envelope>,
    inbound: mpsc::Receiver<Frame>,
    events: mpsc::UnboundedSender<LinkEvent>,
    speed: u32,
}

impl<M: Medium> LinkDriver<M> {
    /// Create a driver for a station using `medium` for output and `inbound`
    /// for frames received from it.
    ///
    /// Returns the driver, a handle for requests and the indication stream.
    pub fn new(
        config: LinkConfig,
        mut medium: M,
        inbound: mpsc::Receiver<Frame>,
    ) -> LinkResult<(Self, LinkHandle, mpsc::UnboundedReceiver<LinkEvent>)> {
        let conn = Connection::new(config)?;
        let speed = conn.qos().baud_rate;
        medium.set_link_speed(speed)?;

        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let driver = Self {
            conn,
            medium,
            requests: req_rx,
            inbound,
            events: event_tx,
            speed,
        };
        Ok((driver, LinkHandle { tx: req_tx }, event_rx))
    }

    /// The connection state.
    pub fn state(&self) -> LinkState {
        self.conn.state()
    }

    /// Drive the connection until every [`LinkHandle`] is dropped or the
    /// inbound channel closes.
    pub async fn run(mut self) -> LinkResult<()> {
        debug!(address = %self.conn.local_address(), "link driver started");

        loop {
            let deadline = self.conn.poll_timeout().map(Instant::from_std);

            tokio::select! {
                request = self.requests.recv() => {
                    let Some((request, reply)) = request else {
                        debug!("all handles dropped, driver stopping");
                        return Ok(());
                    };
                    let name = request.name();
                    let result = self.apply(request);
                    if let Err(err) = &result {
                        warn!(request = name, %err, "request refused");
                    }
                    // The caller may have given up waiting.
                    let _ = reply.send(result);
                }

                frame = self.inbound.recv() => {
                    let Some(frame) = frame else {
                        debug!("medium closed, driver stopping");
                        return Ok(());
                    };
                    self.sense_medium();
                    self.conn.handle_frame(Instant::now().into_std(), frame);
                }

                () = sleep_until(deadline.unwrap_or_else(far_future)), if deadline.is_some() => {
                    self.sense_medium();
                    self.conn.handle_timeout(Instant::now().into_std());
                }
            }

            self.flush().await?;
        }
    }

    fn apply(&mut self, request: Request) -> LinkResult<()> {
        self.sense_medium();
        let now = Instant::now().into_std();
        match request {
            Request::Connect(peer) => self.conn.connect_request(now, peer),
            Request::ConnectResponse => self.conn.connect_response(now),
            Request::Disconnect => self.conn.disconnect_request(now),
            Request::Discovery(slots) => self.conn.discovery_request(now, slots),
            Request::Data(payload) => self.conn.data_request(now, payload),
            Request::UnitData(payload) => self.conn.unit_data_request(now, payload),
            Request::Reset => self.conn.reset_request(now),
            Request::ResetResponse => self.conn.reset_response(now),
            Request::LocalBusy(busy) => {
                self.conn.set_local_busy(busy);
                Ok(())
            }
        }
    }

    fn sense_medium(&mut self) {
        self.conn.set_medium_receiving(self.medium.is_receiving());
        self.conn.set_media_busy(self.medium.is_media_busy());
    }

    /// Send pending frames, then hand indications to the service user.
    async fn flush(&mut self) -> LinkResult<()> {
        while let Some(transmit) = self.conn.poll_transmit() {
            if !transmit.min_turnaround.is_zero() {
                sleep(transmit.min_turnaround).await;
            }
            if transmit.speed != self.speed {
                debug!(from = self.speed, to = transmit.speed, "changing link speed");
                self.medium.set_link_speed(transmit.speed)?;
                self.speed = transmit.speed;
            }
            trace!(frame = transmit.frame.name(), "sending");
            self.medium.send(&transmit.frame)?;
        }

        while let Some(event) = self.conn.poll_event() {
            if self.events.send(event).is_err() {
                trace!("indication dropped, receiver gone");
            }
        }
        Ok(())
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::frame::FrameKind;

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<Frame>>>,
    }

    impl Medium for Recorder {
        fn send(&mut self, frame: &Frame) -> io::Result<()> {
            self.sent.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn set_link_speed(&mut self, _baud_rate: u32) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_with_nobody_around() {
        let medium = Recorder::default();
        let sent = medium.sent.clone();
        let (_inbound_tx, inbound_rx) = mpsc::channel(16);

        let config = LinkConfig::new(0x10).with_rng_seed(3);
        let (driver, handle, mut events) = LinkDriver::new(config, medium, inbound_rx).unwrap();
        let task = tokio::spawn(driver.run());

        handle.discover(6).await.unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event, LinkEvent::DiscoveryConfirm(Vec::new()));

        let xids = sent
            .lock()
            .unwrap()
            .iter()
            .filter(|f| matches!(f.kind, FrameKind::Xid(_)))
            .count();
        assert_eq!(xids, 7);

        drop(handle);
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_request_reports_error() {
        let (_inbound_tx, inbound_rx) = mpsc::channel(16);
        let (driver, handle, _events) =
            LinkDriver::new(LinkConfig::default(), Recorder::default(), inbound_rx).unwrap();
        let task = tokio::spawn(driver.run());

        let err = handle.send(vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, LinkError::NotConnected));
        let err = handle.discover(5).await.unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));

        drop(handle);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_driver_gone() {
        let (_inbound_tx, inbound_rx) = mpsc::channel(1);
        let (driver, handle, _events) =
            LinkDriver::new(LinkConfig::default(), Recorder::default(), inbound_rx).unwrap();
        drop(driver);

        let err = handle.connect(DeviceAddress(0x20)).await.unwrap_err();
        assert!(matches!(err, LinkError::ChannelClosed));
    }
}
