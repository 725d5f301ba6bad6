//! Mock device implementations for testing and development.
//!
//! This module provides a simulated register bus and interrupt line that can
//! be controlled programmatically without requiring physical hardware.

pub mod bus;
pub mod interrupt;

// Re-export commonly used types
pub use bus::{BusTransaction, MockBus, MockBusHandle};
pub use interrupt::{LineStep, MockInterruptHandle, MockInterruptLine};
