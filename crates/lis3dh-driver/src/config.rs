//! Driver configuration.
//!
//! Every field has a board default, so an empty document deserializes to
//! [`DriverConfig::default`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use lis3dh_core::constants::{
    DEFAULT_IRQ_ACK_DELAY_MS, DEFAULT_IRQ_PIN, DEFAULT_SETTLE_DELAY_MS, LIS3DH_ADDRESS,
    MAX_BUS_ADDRESS,
};
use lis3dh_core::{DriverError, InterruptMode, Result};

/// Default capacity of the inbound event channel.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 100;

/// Default capacity of the announcement broadcast channel.
pub const DEFAULT_ANNOUNCEMENT_CAPACITY: usize = 16;

/// Configuration of one LIS3DH instance.
///
/// # Examples
///
/// ```
/// use lis3dh_driver::DriverConfig;
///
/// let config: DriverConfig = serde_json::from_str(r#"{ "irq_pin": 7 }"#).unwrap();
/// assert_eq!(config.irq_pin, 7);
/// assert_eq!(config.bus_address, 0x19);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 7-bit bus address of the sensor.
    pub bus_address: u8,

    /// GPIO pin wired to the sensor's INT1 output.
    pub irq_pin: u32,

    /// Interrupt line mode.
    pub irq_mode: InterruptMode,

    /// Wait after writing the reboot bit, in milliseconds.
    pub settle_delay_ms: u64,

    /// Wait after acknowledging an interrupt, in milliseconds.
    pub irq_ack_delay_ms: u64,

    /// Capacity of the inbound event channel.
    pub event_queue_capacity: usize,

    /// Capacity of the announcement broadcast channel.
    pub announcement_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            bus_address: LIS3DH_ADDRESS,
            irq_pin: DEFAULT_IRQ_PIN,
            irq_mode: InterruptMode::LEVEL_HIGH_DEBOUNCED,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            irq_ack_delay_ms: DEFAULT_IRQ_ACK_DELAY_MS,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            announcement_capacity: DEFAULT_ANNOUNCEMENT_CAPACITY,
        }
    }
}

impl DriverConfig {
    /// Check every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.bus_address > MAX_BUS_ADDRESS {
            return Err(DriverError::invalid_config(
                "bus_address",
                format!(
                    "0x{:02X} is not a 7-bit address (max 0x{:02X})",
                    self.bus_address, MAX_BUS_ADDRESS
                ),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(DriverError::invalid_config(
                "event_queue_capacity",
                "must be greater than zero",
            ));
        }
        if self.announcement_capacity == 0 {
            return Err(DriverError::invalid_config(
                "announcement_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn irq_ack_delay(&self) -> Duration {
        Duration::from_millis(self.irq_ack_delay_ms)
    }
}
