//! Core traits for IrLAP.
//!
//! The state machine never touches hardware. The driver hands every outbound
//! frame to a [`Medium`], which owns framing, CRC and the transceiver.

use std::io;

use crate::frame::Frame;

/// A half-duplex medium that carries IrLAP frames.
///
/// Implementations wrap the physical transceiver and its byte-stuffing codec.
/// Both are outside this crate.
///
/// # Example
///
/// ```
/// use std::io;
/// use irlap::{Frame, Medium};
///
/// #[derive(Default)]
/// struct Recorder {
///     sent: Vec<Frame>,
///     speed: u32,
/// }
///
/// impl Medium for Recorder {
///     fn send(&mut self, frame: &Frame) -> io::Result<()> {
///         self.sent.push(frame.clone());
///         Ok(())
///     }
///
///     fn set_link_speed(&mut self, baud_rate: u32) -> io::Result<()> {
///         self.speed = baud_rate;
///         Ok(())
///     }
/// }
/// ```
pub trait Medium: Send {
    /// Put one frame on the air.
    fn send(&mut self, frame: &Frame) -> io::Result<()>;

    /// Switch the transceiver to a new baud rate.
    ///
    /// Called after link parameters are negotiated and again when the link
    /// falls back to contention mode.
    fn set_link_speed(&mut self, baud_rate: u32) -> io::Result<()>;

    /// Whether a frame is currently being received.
    ///
    /// Used to grant the one-off final and slot timer extensions.
    fn is_receiving(&self) -> bool {
        false
    }

    /// Whether traffic from other stations was seen recently.
    fn is_media_busy(&self) -> bool {
        false
    }
}
