//! Mock register bus for testing and development.
//!
//! This module provides a simulated LIS3DH register file that records every
//! transfer and can be told to fail specific reads or writes.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lis3dh_core::RegisterOp;
use lis3dh_core::constants::{I_AM_LIS3DH, LIS3DH_ADDRESS, WHO_AM_I};
use lis3dh_core::TransportError;

use crate::traits::{RegisterBus, TransportResult};

/// Number of addressable registers on the simulated device.
const REGISTER_COUNT: usize = 0x80;

/// A completed transfer on the mock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusTransaction {
    /// Register read and the value returned.
    Read { address: u8, register: u8, value: u8 },

    /// Register write.
    Write { address: u8, register: u8, value: u8 },
}

impl BusTransaction {
    /// The transfer as a register operation, dropping the address and the
    /// value a read returned.
    pub fn as_op(&self) -> RegisterOp {
        match *self {
            Self::Read { register, .. } => RegisterOp::read(register),
            Self::Write {
                register, value, ..
            } => RegisterOp::write(register, value),
        }
    }
}

/// Fault injected into the mock bus.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fault {
    Read { register: u8, error: TransportError },
    Write { register: u8, error: TransportError },
    AfterTransfers { remaining: usize, error: TransportError },
}

#[derive(Debug)]
struct BusState {
    registers: [u8; REGISTER_COUNT],
    log: Vec<BusTransaction>,
    faults: Vec<Fault>,
    failed_transfers: usize,
    ready: bool,
    latency: Option<Duration>,
}

impl BusState {
    fn new(identity: u8) -> Self {
        let mut registers = [0u8; REGISTER_COUNT];
        registers[WHO_AM_I as usize] = identity;

        Self {
            registers,
            log: Vec::new(),
            faults: Vec::new(),
            failed_transfers: 0,
            ready: true,
            latency: None,
        }
    }

    /// Consume the countdown faults and return the error of the first fault
    /// matching this transfer.
    fn take_fault(&mut self, register: u8, is_write: bool) -> Option<TransportError> {
        let mut hit = None;

        for fault in &mut self.faults {
            let matched = match fault {
                Fault::Read { register: r, error } if !is_write && *r == register => {
                    Some(error.clone())
                }
                Fault::Write { register: r, error } if is_write && *r == register => {
                    Some(error.clone())
                }
                Fault::AfterTransfers { remaining, error } => {
                    if *remaining == 0 {
                        Some(error.clone())
                    } else {
                        *remaining -= 1;
                        None
                    }
                }
                _ => None,
            };

            if hit.is_none() {
                hit = matched;
            }
        }

        if hit.is_some() {
            self.failed_transfers += 1;
        }
        hit
    }
}

fn lock(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    // A panicking test thread must not hide the log from the others.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock register bus for testing and development.
///
/// The bus simulates a device whose identity register holds the LIS3DH
/// identity. Transfers addressed to any other bus address are not
/// acknowledged. A [`MockBusHandle`] inspects the transfer log and injects
/// faults.
///
/// # Examples
///
/// ```
/// use lis3dh_hal::mock::MockBus;
/// use lis3dh_hal::traits::RegisterBus;
///
/// #[tokio::main]
/// async fn main() -> Result<(), lis3dh_core::TransportError> {
///     let (mut bus, handle) = MockBus::new();
///
///     bus.write_register(0x19, 0x20, 0x5F).await?;
///
///     assert_eq!(handle.register(0x20), 0x5F);
///     assert_eq!(handle.writes(), vec![(0x20, 0x5F)]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockBus {
    /// Shared register file and transfer log
    state: Arc<Mutex<BusState>>,

    /// Address the simulated device answers on
    address: u8,
}

impl MockBus {
    /// Create a mock bus with a genuine LIS3DH at the default address.
    pub fn new() -> (Self, MockBusHandle) {
        Self::with_identity(I_AM_LIS3DH)
    }

    /// Create a mock bus whose identity register holds `identity`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lis3dh_hal::mock::MockBus;
    ///
    /// let (_bus, handle) = MockBus::with_identity(0x01);
    /// assert_eq!(handle.register(0x0F), 0x01);
    /// ```
    pub fn with_identity(identity: u8) -> (Self, MockBusHandle) {
        let state = Arc::new(Mutex::new(BusState::new(identity)));

        let bus = Self {
            state: state.clone(),
            address: LIS3DH_ADDRESS,
        };

        (bus, MockBusHandle { state })
    }

    /// Answer on a different bus address.
    pub fn at_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    fn latency(&self) -> Option<Duration> {
        lock(&self.state).latency
    }
}

impl RegisterBus for MockBus {
    async fn read_register(&mut self, address: u8, register: u8) -> TransportResult<u8> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }

        let mut state = lock(&self.state);
        if address != self.address {
            state.failed_transfers += 1;
            return Err(TransportError::Nack);
        }
        if let Some(error) = state.take_fault(register, false) {
            return Err(error);
        }

        let value = state
            .registers
            .get(register as usize)
            .copied()
            .ok_or(TransportError::Nack)?;
        state.log.push(BusTransaction::Read {
            address,
            register,
            value,
        });
        Ok(value)
    }

    async fn write_register(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> TransportResult<()> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }

        let mut state = lock(&self.state);
        if address != self.address {
            state.failed_transfers += 1;
            return Err(TransportError::Nack);
        }
        if let Some(error) = state.take_fault(register, true) {
            return Err(error);
        }

        let slot = state
            .registers
            .get_mut(register as usize)
            .ok_or(TransportError::Nack)?;
        *slot = value;
        state.log.push(BusTransaction::Write {
            address,
            register,
            value,
        });
        Ok(())
    }

    fn is_ready(&self) -> bool {
        lock(&self.state).ready
    }
}

/// Handle for inspecting and controlling a mock bus.
///
/// The handle shares state with its [`MockBus`] and can be cloned freely.
#[derive(Debug, Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<BusState>>,
}

impl MockBusHandle {
    /// Current value of a simulated register.
    pub fn register(&self, register: u8) -> u8 {
        lock(&self.state)
            .registers
            .get(register as usize)
            .copied()
            .unwrap_or_default()
    }

    /// All completed transfers, oldest first.
    pub fn transactions(&self) -> Vec<BusTransaction> {
        lock(&self.state).log.clone()
    }

    /// All completed transfers as register operations.
    pub fn ops(&self) -> Vec<RegisterOp> {
        lock(&self.state).log.iter().map(BusTransaction::as_op).collect()
    }

    /// Completed writes as `(register, value)` pairs.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        lock(&self.state)
            .log
            .iter()
            .filter_map(|t| match *t {
                BusTransaction::Write {
                    register, value, ..
                } => Some((register, value)),
                BusTransaction::Read { .. } => None,
            })
            .collect()
    }

    /// Number of completed writes to `register`.
    pub fn write_count(&self, register: u8) -> usize {
        self.writes().iter().filter(|(r, _)| *r == register).count()
    }

    /// Number of completed transfers.
    pub fn transfer_count(&self) -> usize {
        lock(&self.state).log.len()
    }

    /// Number of transfers that returned an error.
    pub fn failed_transfers(&self) -> usize {
        lock(&self.state).failed_transfers
    }

    /// Forget all logged transfers.
    pub fn clear_log(&self) {
        let mut state = lock(&self.state);
        state.log.clear();
        state.failed_transfers = 0;
    }

    /// Fail every read of `register` with `error`.
    pub fn fail_reads_of(&self, register: u8, error: TransportError) {
        lock(&self.state).faults.push(Fault::Read { register, error });
    }

    /// Fail every write to `register` with `error`.
    pub fn fail_writes_to(&self, register: u8, error: TransportError) {
        lock(&self.state)
            .faults
            .push(Fault::Write { register, error });
    }

    /// Let `transfers` more transfers succeed, then fail every later one.
    pub fn fail_after(&self, transfers: usize, error: TransportError) {
        lock(&self.state).faults.push(Fault::AfterTransfers {
            remaining: transfers,
            error,
        });
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        lock(&self.state).faults.clear();
    }

    /// Simulate an unbound bus controller.
    pub fn set_ready(&self, ready: bool) {
        lock(&self.state).ready = ready;
    }

    /// Delay every transfer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.state).latency = Some(latency);
    }
}
