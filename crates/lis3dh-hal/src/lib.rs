//! Hardware seams for the LIS3DH driver.
//!
//! The driver depends on two external collaborators that this crate models
//! as traits:
//!
//! - [`RegisterBus`]: single-register read/write at a fixed device address.
//! - [`InterruptLine`]: GPIO pin configuration, callback registration and
//!   enable.
//!
//! # Implementations
//!
//! - [`mock`]: controllable in-memory bus and interrupt line with inspection
//!   handles, for tests and development without hardware.
//! - `i2c` (feature `embedded-hal`): adapter for any `embedded-hal` 1.0 I²C
//!   controller.
//!
//! # Thread Safety
//!
//! Bus futures are `Send` and interrupt lines are `Send + Sync`, so a driver
//! built on them can run on the multi-threaded Tokio runtime.
//!
//! [`RegisterBus`]: traits::RegisterBus
//! [`InterruptLine`]: traits::InterruptLine

#[cfg(feature = "embedded-hal")]
pub mod i2c;
pub mod mock;
pub mod traits;

pub use traits::{InterruptCallback, InterruptLine, RegisterBus, TransportResult};

#[cfg(feature = "embedded-hal")]
pub use i2c::I2cRegisterBus;
