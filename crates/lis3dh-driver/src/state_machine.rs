//! Power mode state machine.
//!
//! Owns the current [`PowerState`] and is the only place it changes. Every
//! change is validated against [`PowerState::can_transition_to`] and recorded
//! in a bounded history for postmortem inspection.
//!
//! # Valid Transitions
//!
//! - Uninitialized → Verifying → Resetting → Idle → WakeArmed
//! - WakeArmed → Standby → WakeArmed
//! - any non-failed state → Failed
//!
//! The machine applies no register sequence itself; the device applies the
//! sequence first and only then commits the transition here.
//!
//! # Examples
//!
//! ```
//! use lis3dh_core::PowerState;
//! use lis3dh_driver::StateMachine;
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.current_state(), &PowerState::Uninitialized);
//!
//! machine.transition_to(PowerState::Verifying).unwrap();
//! assert!(machine.transition_to(PowerState::Standby).is_err());
//! ```

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use lis3dh_core::{DriverError, FailureReason, PowerState, Result};

/// Maximum number of state transitions to keep in history.
///
/// Initialization takes four transitions; the rest of the history holds the
/// latest standby and wake cycles.
pub const MAX_HISTORY_SIZE: usize = 64;

/// A single state transition with timestamp.
///
/// The timestamp is not serialized because `Instant` is process-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: PowerState,

    /// The state transitioned to.
    pub to: PowerState,

    /// When the transition occurred.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    /// Create a new state transition record stamped with the current time.
    pub fn new(from: PowerState, to: PowerState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// State machine for the sensor power mode.
///
/// Not synchronized; the owning device keeps it behind its mutex.
#[derive(Debug)]
pub struct StateMachine {
    /// Current power state.
    current_state: PowerState,

    /// History of state transitions (limited to MAX_HISTORY_SIZE).
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// Create a new state machine in the `Uninitialized` state.
    pub fn new() -> Self {
        Self {
            current_state: PowerState::Uninitialized,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Get the current power state.
    pub fn current_state(&self) -> &PowerState {
        &self.current_state
    }

    /// Check if wake detection is latched active.
    pub fn is_active(&self) -> bool {
        self.current_state.is_active()
    }

    /// Get the transition history, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidStateTransition`] if `new_state` is not
    /// reachable from the current state. The machine is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use lis3dh_core::PowerState;
    /// use lis3dh_driver::StateMachine;
    ///
    /// let mut machine = StateMachine::new();
    ///
    /// let transition = machine.transition_to(PowerState::Verifying).unwrap();
    /// assert_eq!(transition.from, PowerState::Uninitialized);
    /// assert_eq!(transition.to, PowerState::Verifying);
    /// ```
    pub fn transition_to(&mut self, new_state: PowerState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(DriverError::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.current_state = new_state;
        self.add_to_history(transition.clone());

        Ok(transition)
    }

    /// Enter the terminal failed state.
    ///
    /// Returns `None` if the machine had already failed; the first reason
    /// wins.
    pub fn fail(&mut self, reason: FailureReason) -> Option<StateTransition> {
        self.transition_to(PowerState::Failed(reason)).ok()
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
