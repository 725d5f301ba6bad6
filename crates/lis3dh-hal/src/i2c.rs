//! `embedded-hal` I²C adapter.
//!
//! Wraps any blocking [`embedded_hal::i2c::I2c`] controller as a
//! [`RegisterBus`]. Every access is a single-register transfer: a write of
//! `[register, value]`, or a write of `[register]` followed by a one-byte read.
//! The auto-increment bit is never set, since burst transfers are not
//! reliable on the target board.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use lis3dh_core::TransportError;

use crate::traits::{RegisterBus, TransportResult};

/// Register bus over a blocking `embedded-hal` I²C controller.
///
/// # Examples
///
/// ```ignore
/// use lis3dh_hal::i2c::I2cRegisterBus;
///
/// let bus = I2cRegisterBus::new(i2c);
/// ```
#[derive(Debug)]
pub struct I2cRegisterBus<I> {
    i2c: I,
}

impl<I> I2cRegisterBus<I> {
    /// Wrap an I²C controller.
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Give the controller back.
    pub fn release(self) -> I {
        self.i2c
    }
}

fn map_error(kind: ErrorKind) -> TransportError {
    match kind {
        ErrorKind::NoAcknowledge(_) => TransportError::Nack,
        other => TransportError::other(format!("I2C error: {other:?}")),
    }
}

impl<I> RegisterBus for I2cRegisterBus<I>
where
    I: I2c + Send + 'static,
{
    async fn read_register(&mut self, address: u8, register: u8) -> TransportResult<u8> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(address, &[register], &mut value)
            .map_err(|e| map_error(e.kind()))?;
        Ok(value[0])
    }

    async fn write_register(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> TransportResult<()> {
        self.i2c
            .write(address, &[register, value])
            .map_err(|e| map_error(e.kind()))
    }
}
