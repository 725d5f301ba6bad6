//! Register map and board constants for the LIS3DH accelerometer.
//!
//! This module defines every register address, identity value and control
//! byte used by the wake-on-motion driver. The values come from the LIS3DH
//! datasheet and the AN3308 application note; sequences built from them live
//! in the driver's register protocol module.
//!
//! # Register Layout
//!
//! The control registers are contiguous, which lets mode sequences be written
//! as a base register plus an ordered byte list:
//!
//! | Register | Address | Purpose |
//! |----------|---------|---------|
//! | `WHO_AM_I` | `0x0F` | Identity, always reads [`I_AM_LIS3DH`] |
//! | `CTRL_REG1` | `0x20` | Output data rate, low-power, axis enable |
//! | `CTRL_REG2` | `0x21` | High-pass filter |
//! | `CTRL_REG3` | `0x22` | INT1 routing |
//! | `CTRL_REG4` | `0x23` | Full scale, block update |
//! | `CTRL_REG5` | `0x24` | Reboot memory content, latch |
//! | `CTRL_REG6` | `0x25` | INT2 routing |
//! | `REFERENCE` | `0x26` | High-pass reference (read resets the filter) |
//! | `INT1_CFG` | `0x30` | Interrupt 1 source selection |
//! | `INT1_SRC` | `0x31` | Interrupt 1 source (read clears the latch) |
//! | `INT1_THS` | `0x32` | Interrupt 1 threshold |
//! | `INT1_DURATION` | `0x33` | Interrupt 1 minimum duration |
//!
//! # Usage
//!
//! ```
//! use lis3dh_core::constants::*;
//!
//! assert_eq!(CTRL_REG1 + 4, CTRL_REG5);
//! assert_eq!(I_AM_LIS3DH, 0x33);
//! ```

// ============================================================================
// Bus Addressing
// ============================================================================

/// 7-bit I²C address of the LIS3DH with SDO/SA0 pulled high.
pub const LIS3DH_ADDRESS: u8 = 0x19;

/// Highest valid 7-bit I²C address.
pub const MAX_BUS_ADDRESS: u8 = 0x7F;

// ============================================================================
// Identity
// ============================================================================

/// Identity register address.
pub const WHO_AM_I: u8 = 0x0F;

/// Value the identity register returns on a genuine LIS3DH.
pub const I_AM_LIS3DH: u8 = 0x33;

// ============================================================================
// Control Registers
// ============================================================================

/// Data rate selection and axis enable.
pub const CTRL_REG1: u8 = 0x20;

/// High-pass filter configuration.
pub const CTRL_REG2: u8 = 0x21;

/// Interrupt routing to INT1.
pub const CTRL_REG3: u8 = 0x22;

/// Full scale and block data update.
pub const CTRL_REG4: u8 = 0x23;

/// Reboot memory content, FIFO enable and interrupt latching.
pub const CTRL_REG5: u8 = 0x24;

/// Interrupt routing to INT2.
pub const CTRL_REG6: u8 = 0x25;

/// Reference value for the high-pass filter. Reading it resets the filter.
pub const REFERENCE_REG: u8 = 0x26;

// ============================================================================
// Interrupt 1 Registers
// ============================================================================

/// Interrupt 1 configuration (event selection and combination).
pub const INT1_CFG: u8 = 0x30;

/// Interrupt 1 source. Reading it acknowledges a latched interrupt.
pub const INT1_SRC: u8 = 0x31;

/// Interrupt 1 threshold.
pub const INT1_THS: u8 = 0x32;

/// Interrupt 1 minimum event duration.
pub const INT1_DURATION: u8 = 0x33;

// ============================================================================
// Control Values
// ============================================================================

/// `CTRL_REG1`: 1.6 kHz low-power data rate, used while rebooting.
///
/// Reboot time depends on the data rate (AN3308, p. 11), so the fastest rate
/// keeps the settle delay short.
pub const CTRL1_FAST_ODR: u8 = 0x80;

/// `CTRL_REG1`: power-down mode with low-power bit kept set.
pub const CTRL1_POWER_DOWN: u8 = 0x08;

/// `CTRL_REG5`: reboot memory content (BOOT bit).
pub const CTRL5_BOOT: u8 = 0x80;

/// `CTRL_REG1..=CTRL_REG5` for wake-on-motion: 100 Hz low-power, all axes,
/// high-pass filter on INT1, IA1 routed to INT1.
pub const WAKE_CTRL_REGS: [u8; 5] = [0x5F, 0x01, 0x40, 0x00, 0x00];

/// `CTRL_REG1..=CTRL_REG5` for idle: 25 Hz low-power, axes off, no routing.
pub const IDLE_CTRL_REGS: [u8; 5] = [0x58, 0x00, 0x00, 0x00, 0x00];

/// `INT1_THS..=INT1_DURATION` for wake-on-motion: threshold 8 LSB, no duration.
pub const WAKE_INT1_THRESHOLDS: [u8; 2] = [0x08, 0x00];

/// `INT1_CFG`: OR combination of the X/Y/Z high events.
pub const INT1_CFG_XYZ_HIGH: u8 = 0x2A;

/// `INT1_CFG`: all interrupt events disabled.
pub const INT1_CFG_DISABLED: u8 = 0x00;

// ============================================================================
// Board Defaults
// ============================================================================

/// GPIO pin of port 0 wired to the sensor's INT1 output.
pub const DEFAULT_IRQ_PIN: u32 = 0x19;

/// Minimum wait after asserting BOOT before the sensor accepts commands.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1;

/// Wait after acknowledging an interrupt before the line may re-assert.
pub const DEFAULT_IRQ_ACK_DELAY_MS: u64 = 1;
