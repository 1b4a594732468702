//! Protocol constants for IrLAP.
//!
//! Values that are fixed by the link protocol itself. Tunables that a station
//! may legitimately change live in [`crate::LinkConfig`].

use std::time::Duration;

// =============================================================================
// ADDRESSING
// =============================================================================

/// Connection address used for frames that are not yet bound to a link.
pub const BROADCAST_CONNECTION_ADDRESS: u8 = 0x7f;

/// Device address that every station accepts (discovery commands).
pub const BROADCAST_DEVICE_ADDRESS: u32 = 0xffff_ffff;

/// Lowest connection address a primary may pick for a new link.
pub const MIN_CONNECTION_ADDRESS: u8 = 0x01;

/// Highest connection address a primary may pick for a new link.
pub const MAX_CONNECTION_ADDRESS: u8 = 0x7e;

// =============================================================================
// SEQUENCE NUMBERS
// =============================================================================

/// Modulus of the Ns/Nr counters (3-bit fields).
pub const SEQ_MODULUS: u8 = 8;

/// Largest usable window under modulo-8 numbering.
pub const MAX_WINDOW_SIZE: u8 = SEQ_MODULUS - 1;

// =============================================================================
// DISCOVERY
// =============================================================================

/// Slot number carried by the closing XID command of a discovery.
pub const FINAL_SLOT: u8 = 0xff;

/// Slot counts a discovery may announce.
pub const VALID_SLOT_COUNTS: [u8; 4] = [1, 6, 8, 16];

/// Time allotted to one discovery slot.
pub const DEFAULT_SLOT_TIMEOUT: Duration = Duration::from_millis(90);

/// Extra slack granted to a replying station beyond the announced slots.
pub const XID_EXTRA_TIMEOUT: Duration = Duration::from_millis(34);

/// Allowance for a peer that is briefly busy before closing its discovery.
pub const SMALL_BUSY_TIMEOUT: Duration = Duration::from_millis(20);

/// One-off slot extension granted while the medium is mid-reception.
pub const SLOT_RECEIVE_EXTENSION: Duration = Duration::from_millis(10);

// =============================================================================
// TIMERS
// =============================================================================

/// One-off final timer extension granted while the medium is mid-reception.
pub const FINAL_RECEIVE_EXTENSION: Duration = Duration::from_millis(300);

/// Lower bound of the randomized connect backoff.
pub const BACKOFF_MIN: Duration = Duration::from_millis(20);

/// Width of the randomized connect backoff window.
pub const BACKOFF_SPREAD_MS: u64 = 30;

// =============================================================================
// RETRY THRESHOLDS
// =============================================================================

/// Final timer expiries between "no activity" status indications.
pub const DEFAULT_N1: u32 = 3;

/// Final timer expiries before the link is declared dead.
pub const DEFAULT_N2: u32 = 6;

/// Connect, disconnect and reset retries before giving up.
pub const DEFAULT_N3: u32 = 8;

// =============================================================================
// LINK PARAMETERS
// =============================================================================

/// Baud rates a station may advertise.
pub const SUPPORTED_BAUD_RATES: [u32; 10] = [
    2_400, 9_600, 19_200, 38_400, 57_600, 115_200, 576_000, 1_152_000, 4_000_000, 16_000_000,
];

/// Contention-mode baud rate, used until parameters are negotiated.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;

/// Contention-mode maximum turnaround time.
pub const DEFAULT_MAX_TURN_TIME: Duration = Duration::from_millis(500);

/// Contention-mode data size.
pub const DEFAULT_DATA_SIZE: usize = 64;

/// Contention-mode window size.
pub const DEFAULT_WINDOW_SIZE: u8 = 1;

/// Contention-mode minimum turnaround time.
pub const DEFAULT_MIN_TURN_TIME: Duration = Duration::from_millis(10);

// =============================================================================
// DISPATCHER
// =============================================================================

/// Upper bound on queued-frame sends drained in a single dispatch.
pub const MAX_DRAIN_ITERATIONS: usize = 32;

/// Default limit on data frames waiting for the transmit turn.
pub const DEFAULT_TX_QUEUE_LIMIT: usize = 64;
