//! Common test utilities for driver integration tests.
//!
//! [`Harness`] wires a driver on a mock bus and mock interrupt line to its
//! router and keeps the mock handles around for inspection. Every `send_*`
//! helper waits until the router has dispatched the event, so assertions
//! after it see the effect.

#![allow(dead_code)]

use std::sync::Arc;

use lis3dh_core::{LifecycleEvent, PowerState, Readiness};
use lis3dh_driver::{DriverConfig, Lis3dhDriver, RouterHandle, RouterStats};
use lis3dh_hal::mock::{MockBus, MockBusHandle, MockInterruptHandle, MockInterruptLine};

pub type MockDriver = Lis3dhDriver<MockBus, MockInterruptLine>;

/// Install a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A driver with its router and mock collaborators.
pub struct Harness {
    pub driver: Arc<MockDriver>,
    pub router: RouterHandle,
    pub bus: MockBusHandle,
    pub irq: MockInterruptHandle,
    lifecycle_sent: u64,
    interrupts_raised: u64,
}

impl Harness {
    /// Genuine LIS3DH with default configuration.
    pub fn new() -> Self {
        let (bus, handle) = MockBus::new();
        Self::with_bus(bus, handle)
    }

    /// Device answering `identity` on the identity register.
    pub fn with_identity(identity: u8) -> Self {
        let (bus, handle) = MockBus::with_identity(identity);
        Self::with_bus(bus, handle)
    }

    pub fn with_bus(bus: MockBus, bus_handle: MockBusHandle) -> Self {
        init_tracing();

        let (line, irq) = MockInterruptLine::new();
        let (driver, router) =
            Lis3dhDriver::register(bus, line, DriverConfig::default()).expect("valid config");

        Self {
            driver,
            router,
            bus: bus_handle,
            irq,
            lifecycle_sent: 0,
            interrupts_raised: 0,
        }
    }

    /// Deliver a lifecycle event and wait until the router dispatched it.
    pub async fn send(&mut self, event: LifecycleEvent) -> RouterStats {
        self.router
            .sender()
            .send(event)
            .await
            .expect("router running");
        self.lifecycle_sent += 1;

        let expected = self.lifecycle_sent;
        self.router
            .wait_for(|stats| stats.lifecycle_events >= expected)
            .await
            .expect("router running")
    }

    /// Deliver `BoardReady` and wait for initialization to settle.
    pub async fn boot(&mut self) -> Readiness {
        self.send(LifecycleEvent::BoardReady).await;
        self.driver.wait_ready().await
    }

    /// Boot a genuine device and forget the bus traffic of initialization.
    pub async fn booted() -> Self {
        let mut harness = Self::new();
        assert_eq!(harness.boot().await, Readiness::Ready);
        harness.bus.clear_log();
        harness
    }

    /// Assert the interrupt pin and wait until the router dispatched it.
    ///
    /// Returns `false` if no callback was registered and enabled.
    pub async fn raise_interrupt(&mut self) -> bool {
        let pin = self.driver.config().irq_pin;
        if !self.irq.trigger(pin) {
            return false;
        }
        self.interrupts_raised += 1;

        let expected = self.interrupts_raised;
        self.router
            .wait_for(|stats| stats.interrupts >= expected)
            .await
            .expect("router running");
        true
    }

    pub async fn state(&self) -> PowerState {
        self.driver.state().await
    }
}
