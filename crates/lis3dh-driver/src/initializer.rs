//! Deferred initialization.
//!
//! Bringing the sensor up involves a reboot settle delay, so it runs on its
//! own Tokio task instead of the context that delivered `BoardReady`. An
//! atomic "started" flag guarantees it runs at most once per initializer, no
//! matter how many times it is scheduled or how the scheduling races.
//!
//! # Steps
//!
//! 1. bus acquisition
//! 2. identity verification
//! 3. reset and settle
//! 4. idle mode
//! 5. interrupt line acquisition and configuration
//! 6. interrupt callback registration
//! 7. interrupt line enable
//!
//! The first failing step aborts the rest, leaves the device `Failed` and
//! publishes [`Readiness::Failed`]. Nothing is retried or rescheduled. On
//! success the device is `WakeArmed`, [`Readiness::Ready`] is published and
//! the module announces [`Announcement::ModuleReady`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use lis3dh_core::{Announcement, DriverError, InterruptMode, Readiness, Result};
use lis3dh_hal::{InterruptCallback, InterruptLine, RegisterBus};

use crate::device::SensorDevice;
use crate::events::Announcer;

/// Everything one initialization run needs.
pub struct InitContext<B, I> {
    /// Device to bring up.
    pub device: Arc<SensorDevice<B>>,

    /// Interrupt line wired to INT1.
    pub irq: I,

    /// Pin of the interrupt line.
    pub irq_pin: u32,

    /// Mode the pin is configured in.
    pub irq_mode: InterruptMode,

    /// Callback registered on the pin.
    pub callback: InterruptCallback,

    /// Where `ModuleReady` is published.
    pub announcer: Announcer,
}

impl<B: RegisterBus, I: InterruptLine> InitContext<B, I> {
    /// Run every step in order, stopping at the first failure.
    async fn run(self) -> Result<()> {
        let id = self.device.bring_up().await.inspect_err(|e| match e {
            DriverError::UnexpectedIdentity { .. } => error!("Device not recognized"),
            DriverError::Transport { .. } => error!(error = %e, "Device not recognized"),
            DriverError::Init { step: "reset", .. } => {
                error!(error = %e, "Device cannot be initialized")
            }
            DriverError::Init { .. } => error!(error = %e, "Device cannot go to idle mode"),
            _ => error!(error = %e, "Device bring-up failed"),
        })?;
        info!("LIS3DH detected (id 0x{:02X})", id.as_u8());

        if let Err(e) = self.arm_interrupt_line() {
            self.device.fail(e.failure_reason()).await;
            return Err(e);
        }

        self.device.arm().await?;
        self.announcer.announce(Announcement::ModuleReady);
        Ok(())
    }

    fn arm_interrupt_line(&self) -> Result<()> {
        if !self.irq.is_ready() {
            error!("Cannot get GPIO device");
            return Err(DriverError::interrupt_setup(
                "acquire",
                "GPIO controller unavailable",
            ));
        }

        self.irq
            .configure(self.irq_pin, self.irq_mode)
            .map_err(|e| {
                error!(pin = self.irq_pin, error = %e, "Cannot configure IRQ pin");
                DriverError::interrupt_setup("configure", e.to_string())
            })?;

        self.irq
            .register_callback(self.irq_pin, self.callback.clone())
            .map_err(|e| {
                error!(pin = self.irq_pin, error = %e, "Cannot configure IRQ callback");
                DriverError::interrupt_setup("register callback", e.to_string())
            })?;

        self.irq.enable(self.irq_pin).map_err(|e| {
            error!(pin = self.irq_pin, error = %e, "Cannot enable IRQ callback");
            DriverError::interrupt_setup("enable", e.to_string())
        })
    }
}

/// Run-once scheduler for the initialization steps.
#[derive(Debug)]
pub struct DeferredInitializer {
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    readiness: Arc<watch::Sender<Readiness>>,
}

impl DeferredInitializer {
    /// Create an initializer that has not started.
    pub fn new() -> Self {
        let (readiness, _) = watch::channel(Readiness::Pending);
        Self {
            started: AtomicBool::new(false),
            task: Mutex::new(None),
            readiness: Arc::new(readiness),
        }
    }

    /// Check if initialization was ever scheduled.
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Subscribe to the initialization outcome.
    pub fn readiness(&self) -> watch::Receiver<Readiness> {
        self.readiness.subscribe()
    }

    /// Spawn the initialization task unless it was already started.
    ///
    /// Returns `true` if this call started it. Must be called inside a Tokio
    /// runtime.
    pub fn schedule<B, I>(&self, context: InitContext<B, I>) -> bool
    where
        B: RegisterBus,
        I: InterruptLine,
    {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let readiness = self.readiness.clone();
        let task = tokio::spawn(async move {
            let outcome = match context.run().await {
                Ok(()) => {
                    info!("accelerometer ready");
                    Readiness::Ready
                }
                Err(e) => {
                    error!(error = %e, "accelerometer initialization failed");
                    Readiness::Failed(e.failure_reason())
                }
            };
            readiness.send_replace(outcome);
        });

        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        true
    }

    /// Wait for the initialization task to finish.
    ///
    /// Returns immediately if it was never started or already joined.
    pub async fn join(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "initialization task did not complete");
        }
    }
}

impl Default for DeferredInitializer {
    fn default() -> Self {
        Self::new()
    }
}
