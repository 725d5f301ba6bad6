//! Core types for the LIS3DH wake-on-motion driver.
//!
//! Holds the register map, the power state model and the error types shared
//! by the HAL seams (`lis3dh-hal`) and the driver (`lis3dh-driver`).

pub mod constants;
pub mod error;
pub mod types;

pub use error::{DriverError, Result, TransportError};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
