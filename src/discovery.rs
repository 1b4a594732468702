//! Discovery bookkeeping.
//!
//! The discovering station announces `S` slots and closes the procedure with
//! a final-slot XID. Every listening station answers in one pseudo-randomly
//! chosen slot, which spreads the replies of several stations over the
//! discovery window.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;

use crate::core::{SMALL_BUSY_TIMEOUT, XID_EXTRA_TIMEOUT};
use crate::frame::{DeviceAddress, DiscoveryInfo};

/// Stations found during one discovery, keyed by address.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryLog {
    entries: BTreeMap<DeviceAddress, DiscoveryInfo>,
}

impl DiscoveryLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a station. A later answer from the same address replaces the
    /// earlier one.
    pub fn insert(&mut self, info: DiscoveryInfo) {
        self.entries.insert(info.address, info);
    }

    /// Look up a station.
    pub fn get(&self, address: DeviceAddress) -> Option<&DiscoveryInfo> {
        self.entries.get(&address)
    }

    /// Number of stations found.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the accumulated entries, ordered by address, leaving the log empty.
    pub fn take(&mut self) -> Vec<DiscoveryInfo> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}

/// Pick the slot to answer a discovery in.
///
/// The result lies in `current..slots`. When the announcement is already at
/// or past the last slot we answer in the current one.
pub fn response_slot<R: Rng + ?Sized>(rng: &mut R, slots: u8, current: u8) -> u8 {
    if current >= slots {
        return current;
    }
    current + rng.gen_range(0..slots - current)
}

/// How long a replying station waits for the rest of a discovery.
///
/// Covers the remaining slots plus slack for the final XID.
pub fn query_timeout(slot_timeout: Duration, slots: u8, current: u8) -> Duration {
    let remaining = u32::from(slots.saturating_sub(current));
    slot_timeout * remaining + XID_EXTRA_TIMEOUT + SMALL_BUSY_TIMEOUT
}

/// Progress of the discovery we are running or answering.
#[derive(Debug, Clone, Default)]
pub(crate) struct DiscoverySession {
    /// Slots announced in the current procedure.
    pub slots: u8,
    /// Next slot to announce (QUERY).
    pub next_slot: u8,
    /// Slot we answer in (REPLY).
    pub reply_slot: u8,
    /// Whether our answer went out (REPLY).
    pub answered: bool,
    /// Answers collected so far (QUERY).
    pub log: DiscoveryLog,
}

impl DiscoverySession {
    /// Start announcing `slots` slots.
    pub fn query(slots: u8) -> Self {
        Self {
            slots,
            next_slot: 0,
            ..Self::default()
        }
    }

    /// Start answering a discovery in `reply_slot`.
    pub fn reply(slots: u8, reply_slot: u8, answered: bool) -> Self {
        Self {
            slots,
            reply_slot,
            answered,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn info(address: u32, nickname: &str) -> DiscoveryInfo {
        DiscoveryInfo {
            address: DeviceAddress(address),
            hints: 0,
            nickname: nickname.to_string(),
        }
    }

    #[test]
    fn test_log_keyed_by_address() {
        let mut log = DiscoveryLog::new();
        log.insert(info(0x30, "c"));
        log.insert(info(0x10, "a"));
        log.insert(info(0x30, "c2"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.get(DeviceAddress(0x30)).map(|i| i.nickname.as_str()), Some("c2"));

        let entries = log.take();
        assert_eq!(entries[0].address, DeviceAddress(0x10));
        assert_eq!(entries[1].address, DeviceAddress(0x30));
        assert!(log.is_empty());
    }

    #[test]
    fn test_response_slot_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for slots in [1u8, 6, 8, 16] {
            for current in 0..slots {
                for _ in 0..20 {
                    let slot = response_slot(&mut rng, slots, current);
                    assert!(slot >= current && slot < slots);
                }
            }
        }
    }

    #[test]
    fn test_response_slot_single_slot() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(response_slot(&mut rng, 1, 0), 0);
        assert_eq!(response_slot(&mut rng, 6, 6), 6);
    }

    #[test]
    fn test_response_slot_deterministic_with_seed() {
        let a: Vec<u8> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| response_slot(&mut rng, 16, 0)).collect()
        };
        let b: Vec<u8> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| response_slot(&mut rng, 16, 0)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_timeout() {
        let slot = Duration::from_millis(90);
        assert_eq!(query_timeout(slot, 6, 0), Duration::from_millis(540 + 34 + 20));
        assert_eq!(query_timeout(slot, 6, 5), Duration::from_millis(90 + 34 + 20));
    }
}
