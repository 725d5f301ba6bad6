//! End-to-end driver scenarios on the mock bus and interrupt line.
//!
//! Every test drives the full path: lifecycle event → router → driver →
//! device → mock bus, and checks both the bus traffic and the resulting
//! power state.

mod common;

use std::time::Duration;

use common::Harness;
use lis3dh_core::constants::{
    CTRL_REG1, CTRL_REG2, INT1_CFG, INT1_CFG_XYZ_HIGH, INT1_SRC, INT1_THS, WHO_AM_I,
};
use lis3dh_core::{
    Announcement, FailureReason, LifecycleEvent, PowerState, Readiness, RegisterOp,
    TransportError,
};
use lis3dh_driver::{DriverEvent, protocol};
use lis3dh_hal::mock::LineStep;

fn identity_reads(harness: &Harness) -> usize {
    harness
        .bus
        .ops()
        .iter()
        .filter(|op| **op == RegisterOp::read(WHO_AM_I))
        .count()
}

// ============================================================================
// Initialization
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_genuine_device_initializes_and_arms() {
    let mut harness = Harness::new();
    let mut announcements = harness.driver.subscribe();

    assert_eq!(harness.boot().await, Readiness::Ready);

    assert_eq!(harness.state().await, PowerState::WakeArmed);
    assert!(harness.driver.is_active().await);

    let mut expected = vec![RegisterOp::read(WHO_AM_I)];
    expected.extend(protocol::encode_reset());
    expected.extend(protocol::encode_idle_mode());
    assert_eq!(harness.bus.ops(), expected);

    let pin = harness.driver.config().irq_pin;
    assert!(harness.irq.is_enabled(pin));
    assert_eq!(harness.irq.callback_count(pin), 1);
    assert_eq!(announcements.recv().await.unwrap(), Announcement::ModuleReady);
}

#[tokio::test(start_paused = true)]
async fn test_identity_mismatch_never_resets() {
    let mut harness = Harness::with_identity(0x01);
    let mut announcements = harness.driver.subscribe();

    assert_eq!(
        harness.boot().await,
        Readiness::Failed(FailureReason::UnexpectedIdentity)
    );

    assert_eq!(
        harness.state().await,
        PowerState::Failed(FailureReason::UnexpectedIdentity)
    );
    assert_eq!(harness.bus.write_count(CTRL_REG1), 0);
    assert!(harness.bus.writes().is_empty());
    assert_eq!(harness.irq.configured(), None);
    assert!(announcements.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_identity_read_failure_is_unrecognized() {
    let mut harness = Harness::new();
    harness.bus.fail_reads_of(WHO_AM_I, TransportError::Nack);

    assert_eq!(
        harness.boot().await,
        Readiness::Failed(FailureReason::UnexpectedIdentity)
    );
    assert_eq!(
        harness.state().await,
        PowerState::Failed(FailureReason::UnexpectedIdentity)
    );
    assert!(harness.bus.writes().is_empty());
    assert_eq!(harness.irq.configured(), None);
}

#[tokio::test(start_paused = true)]
async fn test_reset_failure_is_init_error() {
    let mut harness = Harness::new();
    harness.bus.fail_writes_to(CTRL_REG1, TransportError::timeout(10));

    assert_eq!(
        harness.boot().await,
        Readiness::Failed(FailureReason::InitError)
    );
    assert_eq!(
        harness.state().await,
        PowerState::Failed(FailureReason::InitError)
    );
    assert_eq!(harness.irq.configured(), None);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_configuration_failure() {
    let mut harness = Harness::new();
    harness.irq.fail_step(LineStep::Configure);
    let mut announcements = harness.driver.subscribe();

    assert_eq!(
        harness.boot().await,
        Readiness::Failed(FailureReason::InterruptSetupError)
    );

    assert_eq!(
        harness.state().await,
        PowerState::Failed(FailureReason::InterruptSetupError)
    );
    assert!(announcements.try_recv().is_err());
    assert!(!harness.driver.ready_observed());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_board_ready_initializes_once() {
    let mut harness = Harness::new();

    assert_eq!(harness.boot().await, Readiness::Ready);
    let stats = harness.send(LifecycleEvent::BoardReady).await;

    assert_eq!(stats.lifecycle_events, 2);
    assert_eq!(identity_reads(&harness), 1);
    assert_eq!(harness.state().await, PowerState::WakeArmed);
}

#[tokio::test(start_paused = true)]
async fn test_board_ready_burst_initializes_once() {
    let mut harness = Harness::new();
    let sender = harness.router.sender();

    for _ in 0..5 {
        sender.send(LifecycleEvent::BoardReady).await.unwrap();
    }
    harness
        .router
        .wait_for(|stats| stats.lifecycle_events == 5)
        .await
        .unwrap();

    assert_eq!(harness.driver.wait_ready().await, Readiness::Ready);
    assert_eq!(identity_reads(&harness), 1);
    assert_eq!(harness.bus.write_count(CTRL_REG1), 3);
}

#[tokio::test(start_paused = true)]
async fn test_own_ready_announcement_observed_once() {
    let mut harness = Harness::new();
    assert_eq!(harness.boot().await, Readiness::Ready);

    let stats = harness
        .router
        .wait_for(|stats| stats.announcements >= 1)
        .await
        .unwrap();

    assert_eq!(stats.announcements, 1);
    assert!(harness.driver.ready_observed());
}

#[tokio::test(start_paused = true)]
async fn test_events_during_initialization_wait_for_it() {
    let mut harness = Harness::new();
    harness.bus.set_latency(Duration::from_millis(5));
    let sender = harness.router.sender();

    harness.send(LifecycleEvent::BoardReady).await;

    // Initialization now holds the device inside its first transfer
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(harness.driver.init_started());
    assert_eq!(*harness.driver.readiness().borrow(), Readiness::Pending);

    sender.send(LifecycleEvent::PowerDown).await.unwrap();
    sender.send(DriverEvent::Interrupt).await.unwrap();
    let stats = harness
        .router
        .wait_for(|stats| stats.lifecycle_events == 2 && stats.interrupts == 1)
        .await
        .unwrap();

    assert_eq!(harness.driver.wait_ready().await, Readiness::Ready);
    assert_eq!(stats.consumed, 1);
    assert_eq!(identity_reads(&harness), 1);
    assert_eq!(harness.bus.write_count(INT1_THS), 0);
    assert!(!harness.bus.writes().contains(&(INT1_CFG, INT1_CFG_XYZ_HIGH)));
    assert_eq!(harness.state().await, PowerState::WakeArmed);
    assert!(harness.driver.is_active().await);
}

#[tokio::test(start_paused = true)]
async fn test_board_ready_during_initialization_is_ignored() {
    let mut harness = Harness::new();
    harness.bus.set_latency(Duration::from_millis(5));

    harness.send(LifecycleEvent::BoardReady).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    harness.send(LifecycleEvent::BoardReady).await;

    assert_eq!(harness.driver.wait_ready().await, Readiness::Ready);
    assert_eq!(identity_reads(&harness), 1);
    assert_eq!(harness.bus.write_count(CTRL_REG1), 3);
}

// ============================================================================
// Power transitions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_power_down_switches_to_wake_mode() {
    let mut harness = Harness::booted().await;
    let mut announcements = harness.driver.subscribe();

    let stats = harness.send(LifecycleEvent::PowerDown).await;

    assert_eq!(harness.bus.ops(), protocol::encode_wake_mode());
    assert_eq!(harness.state().await, PowerState::Standby);
    assert!(!harness.driver.is_active().await);
    assert_eq!(stats.consumed, 0);
    assert_eq!(announcements.recv().await.unwrap(), Announcement::Standby);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_power_down_is_noop() {
    let mut harness = Harness::booted().await;
    harness.send(LifecycleEvent::PowerDown).await;
    harness.bus.clear_log();

    let stats = harness.send(LifecycleEvent::PowerDown).await;

    assert_eq!(harness.bus.transfer_count(), 0);
    assert_eq!(harness.state().await, PowerState::Standby);
    assert_eq!(stats.consumed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_power_down_before_board_ready_is_consumed() {
    let mut harness = Harness::new();

    let stats = harness.send(LifecycleEvent::PowerDown).await;

    assert_eq!(stats.consumed, 1);
    assert_eq!(harness.bus.transfer_count(), 0);
    assert_eq!(harness.state().await, PowerState::Uninitialized);
    assert!(!harness.driver.init_started());
}

#[tokio::test(start_paused = true)]
async fn test_power_down_on_failed_device_is_noop() {
    let mut harness = Harness::with_identity(0x01);
    harness.boot().await;
    harness.bus.clear_log();

    harness.send(LifecycleEvent::PowerDown).await;
    harness.send(LifecycleEvent::WakeUp).await;

    assert_eq!(harness.bus.transfer_count(), 0);
    assert_eq!(
        harness.state().await,
        PowerState::Failed(FailureReason::UnexpectedIdentity)
    );
}

#[tokio::test(start_paused = true)]
async fn test_wake_mode_failure_stays_armed() {
    let mut harness = Harness::booted().await;
    harness.bus.fail_writes_to(CTRL_REG2, TransportError::Nack);
    let mut announcements = harness.driver.subscribe();

    let stats = harness.send(LifecycleEvent::PowerDown).await;

    assert_eq!(harness.state().await, PowerState::WakeArmed);
    assert!(harness.driver.is_active().await);
    assert_eq!(stats.consumed, 0);
    assert!(announcements.try_recv().is_err());

    // Nothing is retried on its own
    harness.bus.clear_faults();
    harness.bus.clear_log();
    harness.send(LifecycleEvent::PowerDown).await;
    assert_eq!(harness.bus.ops(), protocol::encode_wake_mode());
    assert_eq!(harness.state().await, PowerState::Standby);
}

#[tokio::test(start_paused = true)]
async fn test_wake_up_returns_to_armed() {
    let mut harness = Harness::booted().await;
    harness.send(LifecycleEvent::PowerDown).await;
    harness.bus.clear_log();

    harness.send(LifecycleEvent::WakeUp).await;

    assert_eq!(harness.bus.ops(), protocol::encode_idle_mode());
    assert_eq!(harness.state().await, PowerState::WakeArmed);
    assert!(harness.driver.is_active().await);

    harness.bus.clear_log();
    harness.send(LifecycleEvent::PowerDown).await;
    assert_eq!(harness.bus.ops(), protocol::encode_wake_mode());
    assert_eq!(harness.state().await, PowerState::Standby);
}

#[tokio::test(start_paused = true)]
async fn test_wake_up_while_armed_is_noop() {
    let mut harness = Harness::booted().await;

    harness.send(LifecycleEvent::WakeUp).await;

    assert_eq!(harness.bus.transfer_count(), 0);
    assert_eq!(harness.state().await, PowerState::WakeArmed);
}

// ============================================================================
// Interrupts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_interrupt_clears_source() {
    let mut harness = Harness::booted().await;

    assert!(harness.raise_interrupt().await);

    assert_eq!(harness.bus.ops(), vec![RegisterOp::read(INT1_SRC)]);
    assert_eq!(harness.state().await, PowerState::WakeArmed);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_in_standby_clears_source() {
    let mut harness = Harness::booted().await;
    harness.send(LifecycleEvent::PowerDown).await;
    harness.bus.clear_log();

    assert!(harness.raise_interrupt().await);
    assert!(harness.raise_interrupt().await);

    assert_eq!(
        harness.bus.ops(),
        vec![RegisterOp::read(INT1_SRC), RegisterOp::read(INT1_SRC)]
    );
    assert_eq!(harness.state().await, PowerState::Standby);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_read_failure_keeps_state() {
    let mut harness = Harness::booted().await;
    harness.bus.fail_reads_of(INT1_SRC, TransportError::Nack);

    assert!(harness.raise_interrupt().await);

    assert_eq!(harness.state().await, PowerState::WakeArmed);
    assert_eq!(harness.bus.failed_transfers(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_interrupt_delivery_without_init() {
    let mut harness = Harness::with_identity(0x01);
    harness.boot().await;

    assert!(!harness.raise_interrupt().await);
}

// ============================================================================
// Router lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_reports_stats() {
    let mut harness = Harness::booted().await;
    harness.send(LifecycleEvent::PowerDown).await;
    harness.raise_interrupt().await;

    let Harness { router, driver, .. } = harness;
    let stats = router.shutdown().await.unwrap();

    assert_eq!(stats.lifecycle_events, 2);
    assert_eq!(stats.interrupts, 1);
    assert_eq!(driver.state().await, PowerState::Standby);
}
