//! Register sequences for each LIS3DH power mode.
//!
//! Every function here is pure: it only describes the ordered register
//! operations, and [`sequencer::apply_sequence`](crate::sequencer::apply_sequence)
//! issues them one by one on the bus. The sensor does not reliably accept
//! burst writes, so control register blocks are expanded into single-register
//! writes.
//!
//! # Sequences
//!
//! | Sequence | Effect |
//! |----------|--------|
//! | [`encode_reset`] | fast data rate, then reboot memory content |
//! | [`encode_idle_mode`] | interrupts off, axes off, power-down |
//! | [`encode_wake_mode`] | 100 Hz low-power, high-pass filtered motion interrupt on INT1 |
//!
//! A failed step fails the whole sequence. Whatever was written before the
//! failure stays written; callers must not assume any partial configuration.

use lis3dh_core::RegisterOp;
use lis3dh_core::constants::{
    CTRL_REG1, CTRL_REG5, CTRL1_FAST_ODR, CTRL1_POWER_DOWN, CTRL5_BOOT, IDLE_CTRL_REGS,
    INT1_CFG, INT1_CFG_DISABLED, INT1_CFG_XYZ_HIGH, INT1_SRC, INT1_THS, REFERENCE_REG,
    WAKE_CTRL_REGS, WAKE_INT1_THRESHOLDS,
};

/// Expand a block of consecutive registers into single-register writes.
fn write_block(base: u8, values: &[u8]) -> impl Iterator<Item = RegisterOp> + '_ {
    (base..).zip(values).map(|(register, &value)| RegisterOp::write(register, value))
}

/// Disable every INT1 event source.
pub fn encode_disable_interrupt() -> Vec<RegisterOp> {
    vec![RegisterOp::write(INT1_CFG, INT1_CFG_DISABLED)]
}

/// Enable the X/Y/Z high events on INT1.
pub fn encode_enable_interrupt() -> Vec<RegisterOp> {
    vec![RegisterOp::write(INT1_CFG, INT1_CFG_XYZ_HIGH)]
}

/// Acknowledge a latched interrupt by reading its source register.
pub fn encode_clear_interrupt() -> Vec<RegisterOp> {
    vec![RegisterOp::read(INT1_SRC)]
}

/// Configure wake-on-motion.
///
/// Interrupts are disabled while the control registers and thresholds are
/// rewritten, the high-pass filter and any stale interrupt are cleared, and
/// only then is INT1 re-enabled.
///
/// # Examples
///
/// ```
/// use lis3dh_core::RegisterOp;
/// use lis3dh_driver::protocol::encode_wake_mode;
///
/// let ops = encode_wake_mode();
/// assert_eq!(ops.first(), Some(&RegisterOp::write(0x30, 0x00)));
/// assert_eq!(ops.last(), Some(&RegisterOp::write(0x30, 0x2A)));
/// ```
pub fn encode_wake_mode() -> Vec<RegisterOp> {
    let mut ops = encode_disable_interrupt();
    ops.extend(write_block(CTRL_REG1, &WAKE_CTRL_REGS));
    ops.extend(write_block(INT1_THS, &WAKE_INT1_THRESHOLDS));
    // Reading REFERENCE resets the internal high-pass filter
    ops.push(RegisterOp::read(REFERENCE_REG));
    ops.extend(encode_clear_interrupt());
    ops.extend(encode_enable_interrupt());
    ops
}

/// Put the sensor in its lowest-power mode with interrupts disabled.
///
/// # Examples
///
/// ```
/// use lis3dh_core::RegisterOp;
/// use lis3dh_driver::protocol::encode_idle_mode;
///
/// let ops = encode_idle_mode();
/// assert_eq!(ops.last(), Some(&RegisterOp::write(0x20, 0x08)));
/// ```
pub fn encode_idle_mode() -> Vec<RegisterOp> {
    let mut ops = encode_disable_interrupt();
    ops.extend(write_block(CTRL_REG1, &IDLE_CTRL_REGS));
    ops.extend(encode_clear_interrupt());
    ops.push(RegisterOp::write(CTRL_REG1, CTRL1_POWER_DOWN));
    ops
}

/// Reboot the sensor's memory content.
///
/// The fast data rate is set first because the reboot time scales with it.
/// The caller must wait the settle delay afterwards.
pub fn encode_reset() -> Vec<RegisterOp> {
    vec![
        RegisterOp::write(CTRL_REG1, CTRL1_FAST_ODR),
        RegisterOp::write(CTRL_REG5, CTRL5_BOOT),
    ]
}
