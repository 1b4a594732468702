//! Station configuration.

use std::time::Duration;

use crate::core::{
    ConfigError, DEFAULT_N1, DEFAULT_N2, DEFAULT_N3, DEFAULT_SLOT_TIMEOUT,
    DEFAULT_TX_QUEUE_LIMIT,
};
use crate::frame::DeviceAddress;
use crate::qos::QosParams;

/// Configuration for one IrLAP station.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Our device address.
    pub address: DeviceAddress,

    /// Capabilities we advertise when connecting.
    pub qos: QosParams,

    /// Final timer expiries between "no activity" status indications.
    pub n1: u32,

    /// Final timer expiries before the link is declared dead.
    pub n2: u32,

    /// Connect, disconnect and reset attempts before giving up.
    pub n3: u32,

    /// Length of one discovery slot.
    pub slot_timeout: Duration,

    /// Data frames that may wait for the transmit turn.
    pub tx_queue_limit: usize,

    /// Nickname announced during discovery.
    pub nickname: String,

    /// Service hint bits announced during discovery.
    pub hints: u16,

    /// Seed for discovery slot and backoff choice. Entropy when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: DeviceAddress(0x0000_0001),
            qos: QosParams {
                baud_rate: 115_200,
                max_turn_time: Duration::from_millis(500),
                data_size: 1024,
                window_size: 7,
                min_turn_time: Duration::from_millis(1),
            },
            n1: DEFAULT_N1,
            n2: DEFAULT_N2,
            n3: DEFAULT_N3,
            slot_timeout: DEFAULT_SLOT_TIMEOUT,
            tx_queue_limit: DEFAULT_TX_QUEUE_LIMIT,
            nickname: String::from("irlap"),
            hints: 0,
            rng_seed: None,
        }
    }
}

impl LinkConfig {
    /// Configuration for the given device address with default tunables.
    pub fn new(address: impl Into<DeviceAddress>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Set the advertised capabilities.
    pub fn with_qos(mut self, qos: QosParams) -> Self {
        self.qos = qos;
        self
    }

    /// Set the retry thresholds.
    pub fn with_retries(mut self, n1: u32, n2: u32, n3: u32) -> Self {
        self.n1 = n1;
        self.n2 = n2;
        self.n3 = n3;
        self
    }

    /// Set the discovery slot length.
    pub fn with_slot_timeout(mut self, timeout: Duration) -> Self {
        self.slot_timeout = timeout;
        self
    }

    /// Set the transmit queue limit.
    pub fn with_tx_queue_limit(mut self, limit: usize) -> Self {
        self.tx_queue_limit = limit;
        self
    }

    /// Set the discovery nickname.
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    /// Set the discovery hint bits.
    pub fn with_hints(mut self, hints: u16) -> Self {
        self.hints = hints;
        self
    }

    /// Seed the random source for reproducible runs.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Check the configuration before a connection is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n1 == 0 || self.n1 >= self.n2 || self.n2 >= self.n3 {
            return Err(ConfigError::RetryThresholds {
                n1: self.n1,
                n2: self.n2,
                n3: self.n3,
            });
        }
        if self.slot_timeout.is_zero() {
            return Err(ConfigError::ZeroSlotTimeout);
        }
        if self.tx_queue_limit == 0 {
            return Err(ConfigError::ZeroQueueLimit);
        }
        self.qos.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LinkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = LinkConfig::new(0xdead_beef)
            .with_retries(2, 4, 6)
            .with_nickname("printer")
            .with_hints(0x0104)
            .with_rng_seed(7);

        assert_eq!(config.address, DeviceAddress(0xdead_beef));
        assert_eq!((config.n1, config.n2, config.n3), (2, 4, 6));
        assert_eq!(config.nickname, "printer");
        assert_eq!(config.hints, 0x0104);
        assert_eq!(config.rng_seed, Some(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_thresholds_must_escalate() {
        let config = LinkConfig::default().with_retries(3, 3, 8);
        assert_eq!(
            config.validate(),
            Err(ConfigError::RetryThresholds { n1: 3, n2: 3, n3: 8 })
        );

        let config = LinkConfig::default().with_retries(0, 2, 3);
        assert!(config.validate().is_err());

        let config = LinkConfig::default().with_retries(1, 5, 4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_tunables() {
        let config = LinkConfig::default().with_slot_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroSlotTimeout));

        let config = LinkConfig::default().with_tx_queue_limit(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroQueueLimit));

        let qos = QosParams {
            window_size: 9,
            ..QosParams::contention()
        };
        let config = LinkConfig::default().with_qos(qos);
        assert_eq!(config.validate(), Err(ConfigError::WindowSize(9)));
    }
}
