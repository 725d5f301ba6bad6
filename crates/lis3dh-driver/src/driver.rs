//! The LIS3DH power driver.
//!
//! [`Lis3dhDriver`] is the observer registered with the
//! [`EventRouter`](crate::router::EventRouter). It turns lifecycle events
//! and interrupt assertions into commands on its [`SensorDevice`]:
//!
//! | Event | Effect |
//! |-------|--------|
//! | `BoardReady` | schedule deferred initialization, once |
//! | `PowerDown` | switch to wake-on-motion if active, then announce `Standby` |
//! | `WakeUp` | leave wake-on-motion, latch active again |
//! | interrupt | clear the interrupt source |
//! | own `ModuleReady` | mark observed |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, trace, warn};

use lis3dh_core::{Announcement, LifecycleEvent, PowerState, Readiness, Result};
use lis3dh_hal::{InterruptLine, RegisterBus};

use crate::config::DriverConfig;
use crate::device::SensorDevice;
use crate::events::{Announcer, Disposition, EventSender, InterruptObserver, LifecycleObserver};
use crate::initializer::{DeferredInitializer, InitContext};
use crate::router::{EventRouter, RouterHandle};

/// Wake-on-motion power driver for one LIS3DH.
pub struct Lis3dhDriver<B, I> {
    device: Arc<SensorDevice<B>>,
    irq: Arc<I>,
    initializer: DeferredInitializer,
    announcer: Announcer,
    events: EventSender,
    config: DriverConfig,
    ready_observed: AtomicBool,
}

impl<B, I> Lis3dhDriver<B, I>
where
    B: RegisterBus,
    I: InterruptLine,
{
    /// Create a driver for the sensor on `bus` with its INT1 output wired to
    /// `irq`.
    ///
    /// `events` is the router's channel. The driver's announcements are
    /// looped back into it and the interrupt callback queues into it.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidConfig`](lis3dh_core::DriverError::InvalidConfig)
    /// if `config` does not validate.
    pub fn new(bus: B, irq: I, config: DriverConfig, events: EventSender) -> Result<Self> {
        config.validate()?;

        let announcer =
            Announcer::new(config.announcement_capacity).with_loopback(events.clone());

        Ok(Self {
            device: Arc::new(SensorDevice::new(bus, &config)),
            irq: Arc::new(irq),
            initializer: DeferredInitializer::new(),
            announcer,
            events,
            config,
            ready_observed: AtomicBool::new(false),
        })
    }

    /// Create a driver, register it with a new router and start routing.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    ///
    /// # Examples
    ///
    /// ```
    /// use lis3dh_core::{LifecycleEvent, PowerState, Readiness};
    /// use lis3dh_driver::{DriverConfig, Lis3dhDriver};
    /// use lis3dh_hal::mock::{MockBus, MockInterruptLine};
    ///
    /// #[tokio::main]
    /// async fn main() -> lis3dh_core::Result<()> {
    ///     let (bus, _bus) = MockBus::new();
    ///     let (irq, _irq) = MockInterruptLine::new();
    ///
    ///     let (driver, router) = Lis3dhDriver::register(bus, irq, DriverConfig::default())?;
    ///     router.sender().send(LifecycleEvent::BoardReady).await?;
    ///
    ///     assert_eq!(driver.wait_ready().await, Readiness::Ready);
    ///     assert_eq!(driver.state().await, PowerState::WakeArmed);
    ///
    ///     router.shutdown().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn register(bus: B, irq: I, config: DriverConfig) -> Result<(Arc<Self>, RouterHandle)> {
        let router = EventRouter::new(&config)?;
        let driver = Arc::new(Self::new(bus, irq, config, router.sender())?);
        let handle = router.register(driver.clone());
        Ok((driver, handle))
    }

    /// Current power state.
    pub async fn state(&self) -> PowerState {
        self.device.state().await
    }

    /// Check if wake detection is latched active.
    pub async fn is_active(&self) -> bool {
        self.device.is_active().await
    }

    /// The device this driver controls.
    pub fn device(&self) -> &Arc<SensorDevice<B>> {
        &self.device
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Subscribe to the outcome of deferred initialization.
    pub fn readiness(&self) -> watch::Receiver<Readiness> {
        self.initializer.readiness()
    }

    /// Wait until deferred initialization has finished, successfully or not.
    ///
    /// Waits forever if `BoardReady` is never delivered.
    pub async fn wait_ready(&self) -> Readiness {
        let mut readiness = self.readiness();
        // The sender lives as long as `self`, so the wait cannot fail
        readiness
            .wait_for(Readiness::is_settled)
            .await
            .map(|outcome| *outcome)
            .unwrap_or(Readiness::Pending)
    }

    /// Subscribe to the module announcements this driver publishes.
    pub fn subscribe(&self) -> broadcast::Receiver<Announcement> {
        self.announcer.subscribe()
    }

    /// Check if the driver saw its own `ModuleReady` announcement.
    pub fn ready_observed(&self) -> bool {
        self.ready_observed.load(Ordering::Acquire)
    }

    /// Check if deferred initialization was ever scheduled.
    pub fn init_started(&self) -> bool {
        self.initializer.has_started()
    }

    fn start_initialization(&self) {
        let context = InitContext {
            device: self.device.clone(),
            irq: self.irq.clone(),
            irq_pin: self.config.irq_pin,
            irq_mode: self.config.irq_mode,
            callback: self.events.interrupt_callback(),
            announcer: self.announcer.clone(),
        };

        if self.initializer.schedule(context) {
            info!(
                address = self.config.bus_address,
                irq_pin = self.config.irq_pin,
                "board ready, initializing accelerometer"
            );
        } else {
            debug!("board ready again, initialization already started");
        }
    }

    async fn power_down(&self) -> Disposition {
        match self.device.enter_standby().await {
            Ok(true) => {
                self.announcer.announce(Announcement::Standby);
                Disposition::Propagate
            }
            Ok(false) => Disposition::Consumed,
            // Logged by the device; the system powers down regardless
            Err(_) => Disposition::Propagate,
        }
    }

    fn mark_ready_observed(&self) {
        let seen_before = self.ready_observed.swap(true, Ordering::AcqRel);
        debug_assert!(!seen_before, "own ModuleReady announcement received twice");
        if seen_before {
            trace!("duplicate ModuleReady announcement ignored");
        }
    }
}

impl<B, I> LifecycleObserver for Lis3dhDriver<B, I>
where
    B: RegisterBus,
    I: InterruptLine,
{
    async fn on_lifecycle(&self, event: LifecycleEvent) -> Disposition {
        match event {
            LifecycleEvent::BoardReady => {
                self.start_initialization();
                Disposition::Propagate
            }
            LifecycleEvent::PowerDown => self.power_down().await,
            LifecycleEvent::WakeUp => {
                match self.device.wake_up().await {
                    Ok(true) => debug!("wake detection re-armed"),
                    Ok(false) => trace!("wake up ignored"),
                    Err(e) => warn!(error = %e, "staying in standby"),
                }
                Disposition::Propagate
            }
        }
    }

    async fn on_announcement(&self, announcement: Announcement) {
        match announcement {
            Announcement::ModuleReady => self.mark_ready_observed(),
            Announcement::Standby => trace!("standby announcement observed"),
        }
    }
}

impl<B, I> InterruptObserver for Lis3dhDriver<B, I>
where
    B: RegisterBus,
    I: InterruptLine,
{
    async fn on_interrupt(&self) {
        match self.device.acknowledge_interrupt().await {
            Ok(true) => trace!("interrupt acknowledged"),
            Ok(false) => debug!("interrupt before initialization ignored"),
            Err(e) => warn!(error = %e, "interrupt not acknowledged"),
        }
    }
}

impl<B, I> std::fmt::Debug for Lis3dhDriver<B, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lis3dhDriver")
            .field("device", &self.device)
            .field("config", &self.config)
            .field("initializer", &self.initializer)
            .field("ready_observed", &self.ready_observed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lis3dh_core::TransportError;
    use lis3dh_core::constants::INT1_CFG;
    use lis3dh_hal::mock::{MockBus, MockInterruptLine};

    use crate::events::event_channel;

    fn driver() -> Lis3dhDriver<MockBus, MockInterruptLine> {
        let (bus, _) = MockBus::new();
        let (irq, _) = MockInterruptLine::new();
        let (events, _rx) = event_channel(8);
        Lis3dhDriver::new(bus, irq, DriverConfig::default(), events).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let (bus, _) = MockBus::new();
        let (irq, _) = MockInterruptLine::new();
        let (events, _rx) = event_channel(8);
        let config = DriverConfig {
            announcement_capacity: 0,
            ..Default::default()
        };

        assert!(Lis3dhDriver::new(bus, irq, config, events).is_err());
    }

    #[tokio::test]
    async fn test_power_down_before_init_is_consumed() {
        let driver = driver();

        let disposition = driver.on_lifecycle(LifecycleEvent::PowerDown).await;

        assert_eq!(disposition, Disposition::Consumed);
        assert_eq!(driver.state().await, PowerState::Uninitialized);
        assert!(!driver.init_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_up_failure_still_propagates() {
        let (bus, bus_handle) = MockBus::new();
        let (irq, _) = MockInterruptLine::new();
        let (events, _rx) = event_channel(8);
        let driver = Lis3dhDriver::new(bus, irq, DriverConfig::default(), events).unwrap();
        driver.device().bring_up().await.unwrap();
        driver.device().arm().await.unwrap();
        driver.device().enter_standby().await.unwrap();
        bus_handle.fail_writes_to(INT1_CFG, TransportError::Nack);

        let disposition = driver.on_lifecycle(LifecycleEvent::WakeUp).await;

        assert_eq!(disposition, Disposition::Propagate);
        assert_eq!(driver.state().await, PowerState::Standby);
        assert!(!driver.is_active().await);
    }

    #[tokio::test]
    async fn test_ignored_wake_up_propagates() {
        let driver = driver();

        let disposition = driver.on_lifecycle(LifecycleEvent::WakeUp).await;

        assert_eq!(disposition, Disposition::Propagate);
        assert_eq!(driver.state().await, PowerState::Uninitialized);
    }

    #[tokio::test]
    async fn test_module_ready_marked_observed() {
        let driver = driver();
        assert!(!driver.ready_observed());

        driver.on_announcement(Announcement::ModuleReady).await;
        assert!(driver.ready_observed());

        driver.on_announcement(Announcement::Standby).await;
        assert!(driver.ready_observed());
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "received twice")]
    async fn test_duplicate_module_ready_asserts_in_debug() {
        let driver = driver();
        driver.on_announcement(Announcement::ModuleReady).await;
        driver.on_announcement(Announcement::ModuleReady).await;
    }

    #[tokio::test]
    async fn test_interrupt_before_init_leaves_bus_alone() {
        let (bus, bus_handle) = MockBus::new();
        let (irq, _) = MockInterruptLine::new();
        let (events, _rx) = event_channel(8);
        let driver = Lis3dhDriver::new(bus, irq, DriverConfig::default(), events).unwrap();

        driver.on_interrupt().await;

        assert_eq!(bus_handle.transfer_count(), 0);
    }
}
