//! Wake-on-motion power driver for the LIS3DH accelerometer.
//!
//! The driver brings the sensor from power-on to an armed state and then
//! follows the system's power lifecycle:
//!
//! 1. `BoardReady` schedules deferred initialization on its own task:
//!    identity check, reset, idle mode, interrupt line setup.
//! 2. Once armed, `PowerDown` switches the sensor to wake-on-motion and
//!    `WakeUp` brings it back to idle.
//! 3. Every assertion of the interrupt line is acknowledged by reading the
//!    interrupt source.
//!
//! Events reach the driver through an [`EventRouter`] and its bounded
//! channel, so delivery order is preserved and no global state is involved.
//!
//! # Modules
//!
//! - [`protocol`]: register sequences for each power mode
//! - [`sequencer`]: identity check, reset and sequence application
//! - [`state_machine`]: validated power state transitions
//! - [`device`]: the sensor behind its mutex
//! - [`initializer`]: run-once deferred initialization
//! - [`events`], [`router`]: event channel, observer traits and dispatch
//! - [`driver`]: the observer tying it all together
//! - [`config`]: driver configuration

pub mod config;
pub mod device;
pub mod driver;
pub mod events;
pub mod initializer;
pub mod protocol;
pub mod router;
pub mod sequencer;
pub mod state_machine;

pub use config::DriverConfig;
pub use device::SensorDevice;
pub use driver::Lis3dhDriver;
pub use events::{
    Announcer, Disposition, DriverEvent, EventSender, InterruptObserver, LifecycleObserver,
    event_channel,
};
pub use initializer::{DeferredInitializer, InitContext};
pub use router::{EventRouter, RouterHandle, RouterStats};
pub use state_machine::{StateMachine, StateTransition};
