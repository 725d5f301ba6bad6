//! Domain types shared by the HAL seams and the driver.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::I_AM_LIS3DH;

/// Why a device ended up in [`PowerState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The identity register did not hold the LIS3DH identity or could not
    /// be read.
    UnexpectedIdentity,

    /// Bus acquisition, reset or idle mode setup failed.
    InitError,

    /// The interrupt line could not be acquired, configured or enabled.
    InterruptSetupError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FailureReason::UnexpectedIdentity => "UnexpectedIdentity",
            FailureReason::InitError => "InitError",
            FailureReason::InterruptSetupError => "InterruptSetupError",
        };
        write!(f, "{}", reason)
    }
}

/// Power state of the accelerometer.
///
/// # Valid Transitions
///
/// - Uninitialized → Verifying → Resetting → Idle → WakeArmed
/// - WakeArmed → Standby (system power-down, wake-on-motion configured)
/// - Standby → WakeArmed (system wake-up)
/// - any non-failed state → Failed
///
/// `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    /// Constructed, no initialization attempt yet.
    Uninitialized,

    /// Reading the identity register.
    Verifying,

    /// Rebooting memory content and waiting for it to settle.
    Resetting,

    /// Idle register configuration applied, interrupt line not armed yet.
    Idle,

    /// Fully initialized and active; a power-down will switch the sensor to
    /// wake-on-motion.
    WakeArmed,

    /// System powered down, sensor in wake-on-motion configuration.
    Standby,

    /// Terminal failure.
    Failed(FailureReason),
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Uninitialized => write!(f, "Uninitialized"),
            PowerState::Verifying => write!(f, "Verifying"),
            PowerState::Resetting => write!(f, "Resetting"),
            PowerState::Idle => write!(f, "Idle"),
            PowerState::WakeArmed => write!(f, "WakeArmed"),
            PowerState::Standby => write!(f, "Standby"),
            PowerState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

impl PowerState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use lis3dh_core::{FailureReason, PowerState};
    ///
    /// assert!(PowerState::Uninitialized.can_transition_to(&PowerState::Verifying));
    /// assert!(PowerState::WakeArmed.can_transition_to(&PowerState::Standby));
    /// assert!(!PowerState::Uninitialized.can_transition_to(&PowerState::WakeArmed));
    ///
    /// let failed = PowerState::Failed(FailureReason::InitError);
    /// assert!(!failed.can_transition_to(&PowerState::Idle));
    /// ```
    pub fn can_transition_to(&self, target: &PowerState) -> bool {
        if self.is_failed() {
            return false;
        }

        matches!(
            (self, target),
            (PowerState::Uninitialized, PowerState::Verifying)
                | (PowerState::Verifying, PowerState::Resetting)
                | (PowerState::Resetting, PowerState::Idle)
                | (PowerState::Idle, PowerState::WakeArmed)
                | (PowerState::WakeArmed, PowerState::Standby)
                | (PowerState::Standby, PowerState::WakeArmed)
                | (_, PowerState::Failed(_))
        )
    }

    /// Check if this is the terminal failed state.
    pub fn is_failed(&self) -> bool {
        matches!(self, PowerState::Failed(_))
    }

    /// Check if the device is latched active (wake detection armed).
    pub fn is_active(&self) -> bool {
        matches!(self, PowerState::WakeArmed)
    }

    /// Check if initialization completed and the device alternates between
    /// the armed and standby modes.
    pub fn is_operational(&self) -> bool {
        matches!(self, PowerState::WakeArmed | PowerState::Standby)
    }
}

/// Proof that the identity register was read and matched.
///
/// Only the sequencer can construct one, so holding a `VerifiedId` means
/// verification happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifiedId(u8);

impl VerifiedId {
    /// Accept an identity byte read from the device.
    ///
    /// Returns `None` if it is not the LIS3DH identity.
    pub fn from_register(value: u8) -> Option<Self> {
        (value == I_AM_LIS3DH).then_some(Self(value))
    }

    /// Get the raw identity byte.
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

/// System-wide lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The board finished bringing up its buses.
    BoardReady,

    /// The system is about to power down.
    PowerDown,

    /// The system woke up from power-down.
    WakeUp,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::BoardReady => write!(f, "BoardReady"),
            LifecycleEvent::PowerDown => write!(f, "PowerDown"),
            LifecycleEvent::WakeUp => write!(f, "WakeUp"),
        }
    }
}

/// Module state announced by the driver to lifecycle observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Announcement {
    /// Initialization completed; the accelerometer module is ready.
    ModuleReady,

    /// Wake-on-motion configured; the module reached standby.
    Standby,
}

/// Outcome of deferred initialization as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Initialization not started or still running.
    Pending,

    /// Initialization completed.
    Ready,

    /// Initialization aborted.
    Failed(FailureReason),
}

impl Readiness {
    /// Check if initialization finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

/// One single-register bus operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegisterOp {
    /// Write `value` to `register`.
    Write { register: u8, value: u8 },

    /// Read `register` and discard the value.
    Read { register: u8 },
}

impl RegisterOp {
    /// Create a write operation.
    pub const fn write(register: u8, value: u8) -> Self {
        Self::Write { register, value }
    }

    /// Create a read-and-discard operation.
    pub const fn read(register: u8) -> Self {
        Self::Read { register }
    }

    /// Register addressed by this operation.
    pub fn register(&self) -> u8 {
        match self {
            Self::Write { register, .. } | Self::Read { register } => *register,
        }
    }

    /// Check if this is a write.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

impl fmt::Display for RegisterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write { register, value } => write!(f, "W 0x{register:02X}<-0x{value:02X}"),
            Self::Read { register } => write!(f, "R 0x{register:02X}"),
        }
    }
}

/// Interrupt trigger type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Level,
    Edge,
}

/// Active polarity of the interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Input pin configuration for an interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterruptMode {
    pub trigger: Trigger,
    pub polarity: Polarity,
    pub debounce: bool,
}

impl InterruptMode {
    /// Level-triggered, active-high, debounced input. This is how the LIS3DH
    /// INT1 output is wired.
    pub const LEVEL_HIGH_DEBOUNCED: Self = Self {
        trigger: Trigger::Level,
        polarity: Polarity::ActiveHigh,
        debounce: true,
    };
}

impl Default for InterruptMode {
    fn default() -> Self {
        Self::LEVEL_HIGH_DEBOUNCED
    }
}
