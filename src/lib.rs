//! # IrLAP
//!
//! **I**nfra**r**ed **L**ink **A**ccess **P**rotocol
//!
//! IrLAP is the HDLC-derived link layer of the IrDA stack. One primary
//! station polls one secondary over a half-duplex medium; the poll/final bit
//! passes the right to transmit back and forth. This crate provides:
//!
//! - **Discovery**: slotted XID exchange to find stations in range
//! - **Connection**: SNRM/UA setup with parameter negotiation and collision
//!   handling
//! - **Data transfer**: windowed I frames with go-back-N recovery, plus
//!   unreliable UI frames
//! - **Recovery**: link reset after sequence errors, N1/N2/N3 retry limits
//!
//! ## Feature Flags
//!
//! - `driver` (default): Tokio task driving a connection on a [`Medium`]
//!
//! ## Modules
//!
//! - [`core`]: Constants, error types and the [`Medium`] trait
//! - [`connection`]: The sans-IO [`Connection`] state machine
//! - [`state`]: The fourteen link states and their handlers
//! - [`driver`]: Tokio driver (requires `driver` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use std::time::Instant;
//! use irlap::prelude::*;
//!
//! let mut station = Connection::new(LinkConfig::new(0x1234_5678))?;
//! station.discovery_request(Instant::now(), 6)?;
//! assert_eq!(station.state(), LinkState::Query);
//!
//! // The first XID goes out at once, the rest on each slot timer.
//! let transmit = station.poll_transmit().expect("first XID");
//! assert!(matches!(transmit.frame.kind, FrameKind::Xid(_)));
//! assert!(station.poll_timeout().is_some());
//! # Ok::<(), irlap::LinkError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod connection;
pub mod core;
pub mod discovery;
pub mod event;
pub mod frame;
pub mod qos;
pub mod sequence;
pub mod state;
pub mod timer;

#[cfg(feature = "driver")]
#[cfg_attr(docsrs, doc(cfg(feature = "driver")))]
pub mod driver;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::config::LinkConfig;
    pub use crate::connection::{Connection, Transmit};
    pub use crate::event::{DisconnectReason, LinkEvent, StatusCode};
    pub use crate::frame::{DeviceAddress, DiscoveryInfo, Frame, FrameKind, Role, Supervisory};
    pub use crate::qos::QosParams;
    pub use crate::state::LinkState;

    #[cfg(feature = "driver")]
    pub use crate::driver::{LinkDriver, LinkHandle};
}

// Re-export commonly used items at crate root
pub use crate::config::LinkConfig;
pub use crate::connection::{Connection, Transmit};
pub use crate::core::{ConfigError, LinkError, LinkResult, Medium};
pub use crate::discovery::DiscoveryLog;
pub use crate::event::{DisconnectReason, LinkEvent, StatusCode};
pub use crate::frame::{
    DeviceAddress, DiscoveryInfo, Frame, FrameKind, Role, Snrm, Supervisory, Ua, Xid,
};
pub use crate::qos::{LinkTiming, QosParams};
pub use crate::sequence::{SeqStatus, WindowTracker, classify_nr, classify_ns};
pub use crate::state::LinkState;
pub use crate::timer::TimerKind;

#[cfg(feature = "driver")]
pub use crate::driver::{LinkDriver, LinkHandle};
