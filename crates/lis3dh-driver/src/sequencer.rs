//! Identity verification, reset and sequence application.
//!
//! These are the only functions that touch the bus. They fail fast: the
//! first failing transfer aborts the sequence and is returned with the
//! register and operation that failed. Nothing is retried.

use std::time::Duration;

use lis3dh_core::constants::{I_AM_LIS3DH, INT1_SRC, WHO_AM_I};
use lis3dh_core::{DriverError, RegisterOp, Result, VerifiedId};
use lis3dh_hal::RegisterBus;
use tracing::{debug, error, trace};

use crate::protocol;

/// Issue `ops` on the bus in order.
///
/// Reads are performed for their side effect and their value is discarded.
///
/// # Errors
///
/// Returns [`DriverError::Transport`] for the first transfer that fails; no
/// later operation is issued.
pub async fn apply_sequence<B: RegisterBus>(
    bus: &mut B,
    address: u8,
    ops: &[RegisterOp],
) -> Result<()> {
    for op in ops {
        trace!(address, %op, "register op");
        match *op {
            RegisterOp::Write { register, value } => bus
                .write_register(address, register, value)
                .await
                .map_err(|e| DriverError::write(register, e))?,
            RegisterOp::Read { register } => {
                bus.read_register(address, register)
                    .await
                    .map_err(|e| DriverError::read(register, e))?;
            }
        }
    }
    Ok(())
}

/// Issue a mode sequence, pausing `ack_delay` after every read of
/// `INT1_SRC`.
///
/// Reading the source register releases a latched INT1; the pause lets the
/// line drop before the rest of the sequence re-enables interrupts.
///
/// # Errors
///
/// Same as [`apply_sequence`].
pub async fn apply_mode<B: RegisterBus>(
    bus: &mut B,
    address: u8,
    ops: &[RegisterOp],
    ack_delay: Duration,
) -> Result<()> {
    for op in ops {
        apply_sequence(bus, address, std::slice::from_ref(op)).await?;
        if *op == RegisterOp::read(INT1_SRC) {
            tokio::time::sleep(ack_delay).await;
        }
    }
    Ok(())
}

/// Read the identity register and check it against the LIS3DH identity.
///
/// # Errors
///
/// - [`DriverError::Transport`] if the register cannot be read
/// - [`DriverError::UnexpectedIdentity`] if it holds another value
pub async fn verify_identity<B: RegisterBus>(bus: &mut B, address: u8) -> Result<VerifiedId> {
    let value = bus.read_register(address, WHO_AM_I).await.map_err(|e| {
        error!(address, register = WHO_AM_I, error = %e, "identity read failed");
        DriverError::read(WHO_AM_I, e)
    })?;

    VerifiedId::from_register(value).ok_or_else(|| {
        error!("Wrong id (0x{:02X} != 0x{:02X})", value, I_AM_LIS3DH);
        DriverError::UnexpectedIdentity {
            expected: I_AM_LIS3DH,
            actual: value,
        }
    })
}

/// Reboot the sensor and wait for it to settle.
///
/// Blocks the calling task for `settle` after the reboot bit is written.
///
/// # Errors
///
/// Returns [`DriverError::Transport`] if either reset write fails. The
/// settle delay is skipped in that case.
pub async fn reset<B: RegisterBus>(bus: &mut B, address: u8, settle: Duration) -> Result<()> {
    apply_sequence(bus, address, &protocol::encode_reset())
        .await
        .inspect_err(|e| error!(error = %e, "reset failed"))?;

    debug!(?settle, "waiting for reboot to settle");
    tokio::time::sleep(settle).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lis3dh_core::TransportError;
    use lis3dh_core::constants::{CTRL_REG1, CTRL_REG5, LIS3DH_ADDRESS};
    use lis3dh_hal::mock::MockBus;

    #[tokio::test]
    async fn test_verify_identity_accepts_lis3dh() {
        let (mut bus, handle) = MockBus::new();

        let id = verify_identity(&mut bus, LIS3DH_ADDRESS).await.unwrap();
        assert_eq!(id.as_u8(), 0x33);
        assert!(handle.writes().is_empty());
    }

    #[tokio::test]
    async fn test_verify_identity_rejects_other_device() {
        let (mut bus, _handle) = MockBus::with_identity(0x01);

        let error = verify_identity(&mut bus, LIS3DH_ADDRESS).await.unwrap_err();
        assert!(matches!(
            error,
            DriverError::UnexpectedIdentity {
                expected: 0x33,
                actual: 0x01
            }
        ));
    }

    #[tokio::test]
    async fn test_verify_identity_transport_failure() {
        let (mut bus, handle) = MockBus::new();
        handle.fail_reads_of(WHO_AM_I, TransportError::Nack);

        let error = verify_identity(&mut bus, LIS3DH_ADDRESS).await.unwrap_err();
        assert!(matches!(
            error,
            DriverError::Transport {
                operation: "read",
                register: WHO_AM_I,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_writes_and_settles() {
        let (mut bus, handle) = MockBus::new();
        let start = tokio::time::Instant::now();

        reset(&mut bus, LIS3DH_ADDRESS, Duration::from_millis(5))
            .await
            .unwrap();

        assert_eq!(handle.writes(), vec![(CTRL_REG1, 0x80), (CTRL_REG5, 0x80)]);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_reset_stops_at_first_failure() {
        let (mut bus, handle) = MockBus::new();
        handle.fail_writes_to(CTRL_REG1, TransportError::Nack);

        let error = reset(&mut bus, LIS3DH_ADDRESS, Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            DriverError::Transport {
                register: CTRL_REG1,
                ..
            }
        ));
        assert_eq!(handle.write_count(CTRL_REG5), 0);
    }

    #[tokio::test]
    async fn test_apply_sequence_in_order() {
        let (mut bus, handle) = MockBus::new();
        let ops = protocol::encode_wake_mode();

        apply_sequence(&mut bus, LIS3DH_ADDRESS, &ops).await.unwrap();

        assert_eq!(handle.ops(), ops);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_mode_pauses_after_source_read() {
        let (mut bus, handle) = MockBus::new();
        let ops = protocol::encode_idle_mode();
        let start = tokio::time::Instant::now();

        apply_mode(&mut bus, LIS3DH_ADDRESS, &ops, Duration::from_millis(1))
            .await
            .unwrap();

        assert_eq!(handle.ops(), ops);
        assert!(start.elapsed() >= Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_mode_skips_pause_after_failed_read() {
        let (mut bus, handle) = MockBus::new();
        handle.fail_reads_of(INT1_SRC, TransportError::Nack);
        let start = tokio::time::Instant::now();

        let error = apply_mode(
            &mut bus,
            LIS3DH_ADDRESS,
            &protocol::encode_clear_interrupt(),
            Duration::from_millis(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, DriverError::Transport { register: INT1_SRC, .. }));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_apply_sequence_fails_on_read() {
        let (mut bus, handle) = MockBus::new();
        handle.fail_reads_of(INT1_SRC, TransportError::timeout(10));
        let ops = protocol::encode_wake_mode();

        let error = apply_sequence(&mut bus, LIS3DH_ADDRESS, &ops)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            DriverError::Transport {
                operation: "read",
                register: INT1_SRC,
                ..
            }
        ));
        // Everything before the INT1_SRC read went out, nothing after
        let issued = handle.ops();
        assert_eq!(issued, ops[..issued.len()].to_vec());
        assert_eq!(issued.len(), ops.len() - 2);
    }
}
