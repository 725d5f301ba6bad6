//! Seams to the external register bus and interrupt line.
//!
//! The driver never talks to a controller directly. It issues single-register
//! transfers through [`RegisterBus`] and arms the sensor's interrupt output
//! through [`InterruptLine`]. Mock implementations live in
//! [`mock`](crate::mock); an `embedded-hal` adapter lives in `i2c` behind the
//! `embedded-hal` feature.
//!
//! Bus methods return `impl Future + Send` so that generic drivers can run
//! them on a multi-threaded Tokio runtime. Implementations may still write
//! them as plain `async fn`.

use std::future::Future;
use std::sync::Arc;

use lis3dh_core::{InterruptMode, TransportError};

/// Result type for transfers on the external transports.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Single-byte addressed register transport (I²C or SPI).
///
/// No burst transfer is assumed to work: every operation addresses exactly
/// one register.
///
/// # Examples
///
/// ```
/// use lis3dh_hal::traits::RegisterBus;
/// use lis3dh_hal::mock::MockBus;
/// use lis3dh_core::constants::{LIS3DH_ADDRESS, WHO_AM_I};
///
/// #[tokio::main]
/// async fn main() -> Result<(), lis3dh_core::TransportError> {
///     let (mut bus, _handle) = MockBus::new();
///
///     let id = bus.read_register(LIS3DH_ADDRESS, WHO_AM_I).await?;
///     assert_eq!(id, 0x33);
///     Ok(())
/// }
/// ```
pub trait RegisterBus: Send + 'static {
    /// Read one register of the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device does not acknowledge, the transfer
    /// times out or the controller is gone.
    fn read_register(
        &mut self,
        address: u8,
        register: u8,
    ) -> impl Future<Output = TransportResult<u8>> + Send;

    /// Write one register of the device at `address`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`read_register`](RegisterBus::read_register).
    fn write_register(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> impl Future<Output = TransportResult<()>> + Send;

    /// Check whether the controller behind this bus is bound and usable.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Callback run by the interrupt line when the pin asserts.
///
/// It runs in the interrupt delivery context and must not block.
pub type InterruptCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// GPIO interrupt line abstraction.
///
/// The line is owned by the GPIO subsystem; the driver only borrows it, so
/// every method takes `&self`.
pub trait InterruptLine: Send + Sync + 'static {
    /// Configure `pin` as an interrupt input.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin cannot be configured in `mode`.
    fn configure(&self, pin: u32, mode: InterruptMode) -> TransportResult<()>;

    /// Register the callback run when `pin` asserts.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback cannot be attached.
    fn register_callback(&self, pin: u32, callback: InterruptCallback) -> TransportResult<()>;

    /// Enable callback delivery for `pin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin cannot be enabled.
    fn enable(&self, pin: u32) -> TransportResult<()>;

    /// Check whether the GPIO controller is bound and usable.
    fn is_ready(&self) -> bool {
        true
    }
}

impl<T: InterruptLine> InterruptLine for Arc<T> {
    fn configure(&self, pin: u32, mode: InterruptMode) -> TransportResult<()> {
        (**self).configure(pin, mode)
    }

    fn register_callback(&self, pin: u32, callback: InterruptCallback) -> TransportResult<()> {
        (**self).register_callback(pin, callback)
    }

    fn enable(&self, pin: u32) -> TransportResult<()> {
        (**self).enable(pin)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}
