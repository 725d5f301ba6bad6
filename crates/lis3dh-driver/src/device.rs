//! The sensor device.
//!
//! [`SensorDevice`] owns the register bus and the power state machine. Both
//! live behind a single async mutex that stays locked for a whole register
//! sequence, so a transition in flight excludes every other transition and a
//! duplicate event observes the state the first one left behind.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use lis3dh_core::{DriverError, FailureReason, PowerState, Result, VerifiedId};
use lis3dh_hal::RegisterBus;

use crate::config::DriverConfig;
use crate::protocol;
use crate::sequencer;
use crate::state_machine::{StateMachine, StateTransition};

/// Mutable device state guarded by the device mutex.
struct DeviceInner<B> {
    bus: B,
    machine: StateMachine,
    identity: Option<VerifiedId>,
    active: bool,
}

impl<B> DeviceInner<B> {
    /// Commit a state change and keep the `active` latch in sync.
    fn commit(&mut self, state: PowerState) -> Result<StateTransition> {
        let transition = self.machine.transition_to(state)?;
        self.active = self.machine.is_active();
        debug!(from = %transition.from, to = %transition.to, "power state changed");
        Ok(transition)
    }

    /// Put the device in its terminal failed state and hand the error back.
    fn abort(&mut self, error: DriverError) -> DriverError {
        let reason = error.failure_reason();
        if let Some(transition) = self.machine.fail(reason) {
            self.active = false;
            warn!(from = %transition.from, %reason, "device failed");
        }
        error
    }
}

/// An LIS3DH on a register bus.
///
/// All bus traffic for the sensor goes through this type.
pub struct SensorDevice<B> {
    inner: Mutex<DeviceInner<B>>,
    address: u8,
    settle_delay: Duration,
    irq_ack_delay: Duration,
}

impl<B: RegisterBus> SensorDevice<B> {
    /// Take ownership of `bus`. The device starts `Uninitialized`.
    pub fn new(bus: B, config: &DriverConfig) -> Self {
        Self {
            inner: Mutex::new(DeviceInner {
                bus,
                machine: StateMachine::new(),
                identity: None,
                active: false,
            }),
            address: config.bus_address,
            settle_delay: config.settle_delay(),
            irq_ack_delay: config.irq_ack_delay(),
        }
    }

    /// Current power state.
    pub async fn state(&self) -> PowerState {
        *self.inner.lock().await.machine.current_state()
    }

    /// Check if wake detection is latched active.
    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.active
    }

    /// Identity read during initialization, if verification succeeded.
    pub async fn identity(&self) -> Option<VerifiedId> {
        self.inner.lock().await.identity
    }

    /// Recorded state transitions, oldest first.
    pub async fn history(&self) -> Vec<StateTransition> {
        self.inner.lock().await.machine.history().iter().cloned().collect()
    }

    /// Run the register part of initialization: bus check, identity
    /// verification, reset and idle mode.
    ///
    /// Leaves the device `Idle` on success and `Failed` on any error.
    ///
    /// # Errors
    ///
    /// - [`DriverError::InvalidStateTransition`] if the device is not
    ///   `Uninitialized`; the device is left untouched
    /// - [`DriverError::BusUnavailable`] if the bus is not ready
    /// - [`DriverError::Transport`] if the identity register cannot be read
    /// - [`DriverError::UnexpectedIdentity`] on identity mismatch
    /// - [`DriverError::Init`] if reset or idle mode fails
    pub async fn bring_up(&self) -> Result<VerifiedId> {
        let mut inner = self.inner.lock().await;
        inner.commit(PowerState::Verifying)?;

        match self.bring_up_locked(&mut inner).await {
            Ok(id) => Ok(id),
            Err(e) => Err(inner.abort(e)),
        }
    }

    async fn bring_up_locked(&self, inner: &mut DeviceInner<B>) -> Result<VerifiedId> {
        if !inner.bus.is_ready() {
            error!("Cannot get I2C device");
            return Err(DriverError::BusUnavailable);
        }

        let id = sequencer::verify_identity(&mut inner.bus, self.address).await?;
        inner.identity = Some(id);
        inner.commit(PowerState::Resetting)?;

        sequencer::reset(&mut inner.bus, self.address, self.settle_delay)
            .await
            .map_err(|e| DriverError::init("reset", e))?;

        let idle = protocol::encode_idle_mode();
        sequencer::apply_mode(&mut inner.bus, self.address, &idle, self.irq_ack_delay)
            .await
            .map_err(|e| DriverError::init("idle mode", e))?;

        inner.commit(PowerState::Idle)?;
        Ok(id)
    }

    /// Latch the device active once its interrupt line is armed.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidStateTransition`] unless the device is
    /// `Idle`.
    pub async fn arm(&self) -> Result<()> {
        self.inner.lock().await.commit(PowerState::WakeArmed)?;
        Ok(())
    }

    /// Enter the terminal failed state.
    ///
    /// Returns `false` if the device had already failed.
    pub async fn fail(&self, reason: FailureReason) -> bool {
        let mut inner = self.inner.lock().await;
        let failed = inner.machine.fail(reason).is_some();
        if failed {
            inner.active = false;
            warn!(%reason, "device failed");
        }
        failed
    }

    /// Switch to wake-on-motion because the system is powering down.
    ///
    /// Returns `Ok(false)` without touching the bus if the device is not
    /// active. On success the device is in `Standby`.
    ///
    /// # Errors
    ///
    /// Returns the failing transfer if the wake mode sequence fails. The
    /// device stays `WakeArmed` and nothing is retried.
    pub async fn enter_standby(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.active {
            debug!(state = %inner.machine.current_state(), "power down ignored, not active");
            return Ok(false);
        }

        let wake = protocol::encode_wake_mode();
        if let Err(e) =
            sequencer::apply_mode(&mut inner.bus, self.address, &wake, self.irq_ack_delay).await
        {
            error!(error = %e, "Cannot switch to wake up mode");
            return Err(e);
        }

        inner.commit(PowerState::Standby)?;
        info!("Switched to wake up mode");
        Ok(true)
    }

    /// Leave wake-on-motion because the system woke up.
    ///
    /// Reapplies idle mode and latches the device active again. Returns
    /// `Ok(false)` without touching the bus unless the device is in
    /// `Standby`.
    ///
    /// # Errors
    ///
    /// Returns the failing transfer if the idle mode sequence fails. The
    /// device stays in `Standby`.
    pub async fn wake_up(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if *inner.machine.current_state() != PowerState::Standby {
            debug!(state = %inner.machine.current_state(), "wake up ignored, not in standby");
            return Ok(false);
        }

        let idle = protocol::encode_idle_mode();
        if let Err(e) =
            sequencer::apply_mode(&mut inner.bus, self.address, &idle, self.irq_ack_delay).await
        {
            error!(error = %e, "Cannot leave wake up mode");
            return Err(e);
        }

        inner.commit(PowerState::WakeArmed)?;
        info!("Switched to idle mode");
        Ok(true)
    }

    /// Clear a latched interrupt so the line can assert again.
    ///
    /// Reads and discards the interrupt source, then waits the acknowledge
    /// delay. The power state never changes. Returns `Ok(false)` without
    /// touching the bus unless the device is armed or in standby.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Transport`] if the source register cannot be
    /// read.
    pub async fn acknowledge_interrupt(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.machine.current_state().is_operational() {
            trace!(state = %inner.machine.current_state(), "interrupt ignored");
            return Ok(false);
        }

        let clear = protocol::encode_clear_interrupt();
        sequencer::apply_mode(&mut inner.bus, self.address, &clear, self.irq_ack_delay)
            .await
            .inspect_err(|e| error!(error = %e, "Cannot clear interrupt"))?;
        Ok(true)
    }
}

impl<B> std::fmt::Debug for SensorDevice<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorDevice")
            .field("address", &self.address)
            .field("settle_delay", &self.settle_delay)
            .field("irq_ack_delay", &self.irq_ack_delay)
            .finish_non_exhaustive()
    }
}
