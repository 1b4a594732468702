//! Link parameters and their negotiation.
//!
//! Both stations advertise their capabilities in the SNRM/UA exchange. The
//! negotiated set is the most conservative combination of the two, and the
//! protocol timers are derived from it.

use std::time::Duration;

use crate::core::{
    ConfigError, DEFAULT_BAUD_RATE, DEFAULT_DATA_SIZE, DEFAULT_MAX_TURN_TIME,
    DEFAULT_MIN_TURN_TIME, DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE, SUPPORTED_BAUD_RATES,
};

/// Quality-of-service parameters carried in SNRM and UA frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosParams {
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// Longest time a station may hold the transmit turn.
    pub max_turn_time: Duration,
    /// Largest information field in bytes.
    pub data_size: usize,
    /// Frames that may be outstanding before a poll/final bit is required.
    pub window_size: u8,
    /// Quiet time the receiver needs before it can receive again.
    pub min_turn_time: Duration,
}

impl Default for QosParams {
    fn default() -> Self {
        Self::contention()
    }
}

impl QosParams {
    /// Parameters used before a link is negotiated and after it is torn down.
    pub const fn contention() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            max_turn_time: DEFAULT_MAX_TURN_TIME,
            data_size: DEFAULT_DATA_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            min_turn_time: DEFAULT_MIN_TURN_TIME,
        }
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            return Err(ConfigError::BaudRate(self.baud_rate));
        }
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        if self.data_size == 0 {
            return Err(ConfigError::ZeroDataSize);
        }
        if self.max_turn_time.is_zero() {
            return Err(ConfigError::ZeroTurnTime);
        }
        Ok(())
    }

    /// Replace every unusable field with its contention value.
    pub fn sanitized(&self) -> QosParams {
        let fallback = Self::contention();
        QosParams {
            baud_rate: if SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
                self.baud_rate
            } else {
                fallback.baud_rate
            },
            max_turn_time: if self.max_turn_time.is_zero() {
                fallback.max_turn_time
            } else {
                self.max_turn_time
            },
            data_size: if self.data_size == 0 {
                fallback.data_size
            } else {
                self.data_size
            },
            window_size: if (1..=MAX_WINDOW_SIZE).contains(&self.window_size) {
                self.window_size
            } else {
                fallback.window_size
            },
            min_turn_time: self.min_turn_time,
        }
    }

    /// Combine our capabilities with the peer's.
    ///
    /// Every capability takes the smaller value, except the minimum
    /// turnaround time, where the slower receiver wins. Peer fields that
    /// fail [`QosParams::validate`] are taken at their contention value.
    pub fn negotiate(&self, peer: &QosParams) -> QosParams {
        let peer = peer.sanitized();
        QosParams {
            baud_rate: self.baud_rate.min(peer.baud_rate),
            max_turn_time: self.max_turn_time.min(peer.max_turn_time),
            data_size: self.data_size.min(peer.data_size),
            window_size: self.window_size.min(peer.window_size),
            min_turn_time: self.min_turn_time.max(peer.min_turn_time),
        }
    }
}

/// Timer intervals and byte budget derived from a parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    /// Primary waits this long for the secondary's final frame.
    pub final_timeout: Duration,
    /// Primary polls the secondary at least this often.
    pub poll_timeout: Duration,
    /// Secondary tears down after this long without a poll.
    pub watchdog_timeout: Duration,
    /// Bytes a station may send in one turn.
    pub line_capacity: usize,
}

impl LinkTiming {
    /// Derive timing from negotiated parameters.
    pub fn from_qos(qos: &QosParams) -> Self {
        let final_timeout = qos.max_turn_time;
        let turn_ms = qos.max_turn_time.as_millis() as u64;
        let capacity = (qos.baud_rate as u64 / 8) * turn_ms / 1000;

        Self {
            final_timeout,
            poll_timeout: qos.max_turn_time,
            watchdog_timeout: final_timeout * 2,
            line_capacity: (capacity as usize).max(qos.data_size),
        }
    }
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self::from_qos(&QosParams::contention())
    }
}
