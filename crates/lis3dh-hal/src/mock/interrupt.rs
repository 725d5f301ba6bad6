//! Mock interrupt line for testing and development.

use std::sync::{Arc, Mutex, MutexGuard};

use lis3dh_core::{InterruptMode, TransportError};

use crate::traits::{InterruptCallback, InterruptLine, TransportResult};

/// Setup step of the interrupt line that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStep {
    Configure,
    RegisterCallback,
    Enable,
}

#[derive(Default)]
struct LineState {
    configured: Option<(u32, InterruptMode)>,
    callbacks: Vec<(u32, InterruptCallback)>,
    enabled: Vec<u32>,
    failing: Vec<LineStep>,
    unavailable: bool,
    delivered: usize,
}

impl LineState {
    fn check(&self, step: LineStep) -> TransportResult<()> {
        if self.failing.contains(&step) {
            return Err(TransportError::other(format!("{step:?} rejected")));
        }
        Ok(())
    }
}

fn lock(state: &Mutex<LineState>) -> MutexGuard<'_, LineState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock GPIO interrupt line.
///
/// Records the configuration the driver applies and lets tests raise the
/// interrupt through a [`MockInterruptHandle`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use lis3dh_core::InterruptMode;
/// use lis3dh_hal::mock::MockInterruptLine;
/// use lis3dh_hal::traits::InterruptLine;
///
/// let (line, handle) = MockInterruptLine::new();
/// let hits = Arc::new(AtomicUsize::new(0));
///
/// let counter = hits.clone();
/// line.configure(25, InterruptMode::LEVEL_HIGH_DEBOUNCED).unwrap();
/// line.register_callback(25, Arc::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// })).unwrap();
/// line.enable(25).unwrap();
///
/// assert!(handle.trigger(25));
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct MockInterruptLine {
    state: Arc<Mutex<LineState>>,
}

impl std::fmt::Debug for MockInterruptLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockInterruptLine")
            .field("configured", &state.configured)
            .field("callbacks", &state.callbacks.len())
            .field("enabled", &state.enabled)
            .finish()
    }
}

impl MockInterruptLine {
    /// Create a new mock interrupt line and its control handle.
    pub fn new() -> (Self, MockInterruptHandle) {
        let state = Arc::new(Mutex::new(LineState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockInterruptHandle { state },
        )
    }
}

impl InterruptLine for MockInterruptLine {
    fn configure(&self, pin: u32, mode: InterruptMode) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.check(LineStep::Configure)?;
        state.configured = Some((pin, mode));
        Ok(())
    }

    fn register_callback(&self, pin: u32, callback: InterruptCallback) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.check(LineStep::RegisterCallback)?;
        state.callbacks.push((pin, callback));
        Ok(())
    }

    fn enable(&self, pin: u32) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.check(LineStep::Enable)?;
        if !state.enabled.contains(&pin) {
            state.enabled.push(pin);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !lock(&self.state).unavailable
    }
}

/// Handle for raising interrupts on and inspecting a mock interrupt line.
#[derive(Clone)]
pub struct MockInterruptHandle {
    state: Arc<Mutex<LineState>>,
}

impl MockInterruptHandle {
    /// Assert `pin` once.
    ///
    /// Runs every callback registered for `pin` if the pin is enabled.
    /// Returns `true` if at least one callback ran.
    pub fn trigger(&self, pin: u32) -> bool {
        let callbacks: Vec<InterruptCallback> = {
            let mut state = lock(&self.state);
            if !state.enabled.contains(&pin) {
                return false;
            }
            let callbacks: Vec<_> = state
                .callbacks
                .iter()
                .filter(|(p, _)| *p == pin)
                .map(|(_, cb)| cb.clone())
                .collect();
            state.delivered += callbacks.len();
            callbacks
        };

        // Callbacks run outside the lock, like an ISR would
        for callback in &callbacks {
            callback();
        }
        !callbacks.is_empty()
    }

    /// Pin and mode of the last successful `configure`.
    pub fn configured(&self) -> Option<(u32, InterruptMode)> {
        lock(&self.state).configured
    }

    /// Number of callbacks registered for `pin`.
    pub fn callback_count(&self, pin: u32) -> usize {
        lock(&self.state)
            .callbacks
            .iter()
            .filter(|(p, _)| *p == pin)
            .count()
    }

    /// Check if callback delivery is enabled for `pin`.
    pub fn is_enabled(&self, pin: u32) -> bool {
        lock(&self.state).enabled.contains(&pin)
    }

    /// Total number of callback invocations.
    pub fn delivered(&self) -> usize {
        lock(&self.state).delivered
    }

    /// Make `step` fail from now on.
    pub fn fail_step(&self, step: LineStep) {
        lock(&self.state).failing.push(step);
    }

    /// Simulate an unbound GPIO controller.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }
}
