//! Lifecycle event router.
//!
//! The router owns the receiving side of the event channel and dispatches
//! each [`DriverEvent`] to an observer on its own task, one at a time and in
//! arrival order.
//!
//! ```text
//! ┌──────────────┐
//! │ Lifecycle    │──────►┌─────────────────┐
//! │ bus          │       │                 │
//! └──────────────┘       │  Event Channel  │
//! ┌──────────────┐       │  (mpsc)         │──────► Router task ──► Observer
//! │ Interrupt    │──────►│                 │
//! │ line         │       │                 │
//! └──────────────┘       └─────────────────┘
//!        ▲                        ▲
//!        │                        │ loopback
//!   callback               Announcer (ModuleReady, Standby)
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lis3dh_core::LifecycleEvent;
//! use lis3dh_driver::{DriverConfig, EventRouter, Lis3dhDriver};
//! use lis3dh_hal::mock::{MockBus, MockInterruptLine};
//!
//! #[tokio::main]
//! async fn main() -> lis3dh_core::Result<()> {
//!     let config = DriverConfig::default();
//!     let router = EventRouter::new(&config)?;
//!
//!     let (bus, _) = MockBus::new();
//!     let (irq, _) = MockInterruptLine::new();
//!     let driver = Arc::new(Lis3dhDriver::new(bus, irq, config, router.sender())?);
//!
//!     let handle = router.register(driver.clone());
//!     handle.sender().send(LifecycleEvent::BoardReady).await?;
//!     driver.wait_ready().await;
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use lis3dh_core::{DriverError, Result};

use crate::config::DriverConfig;
use crate::events::{
    DriverEvent, Disposition, EventSender, InterruptObserver, LifecycleObserver, event_channel,
};

/// Counters kept by the router task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStats {
    /// Events dispatched, of any kind.
    pub events_handled: u64,

    /// Lifecycle events dispatched.
    pub lifecycle_events: u64,

    /// Lifecycle events the observer consumed.
    pub consumed: u64,

    /// Announcements dispatched.
    pub announcements: u64,

    /// Interrupt assertions dispatched.
    pub interrupts: u64,
}

impl RouterStats {
    fn record(&mut self, event: &DriverEvent, disposition: Option<Disposition>) {
        self.events_handled += 1;
        match event {
            DriverEvent::Lifecycle(_) => self.lifecycle_events += 1,
            DriverEvent::Announcement(_) => self.announcements += 1,
            DriverEvent::Interrupt => self.interrupts += 1,
        }
        if disposition == Some(Disposition::Consumed) {
            self.consumed += 1;
        }
    }
}

/// Router waiting for its observer.
///
/// The channel exists as soon as the router is created, so senders can be
/// handed out (to the driver's announcer, to the interrupt callback) before
/// the observer is registered.
pub struct EventRouter {
    event_tx: EventSender,
    event_rx: mpsc::Receiver<DriverEvent>,
}

impl EventRouter {
    /// Create a router whose channel holds `config.event_queue_capacity`
    /// events.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: &DriverConfig) -> Result<Self> {
        config.validate()?;

        let (event_tx, event_rx) = event_channel(config.event_queue_capacity);
        Ok(Self { event_tx, event_rx })
    }

    /// Sender for the router's channel.
    pub fn sender(&self) -> EventSender {
        self.event_tx.clone()
    }

    /// Register `observer` and start dispatching.
    ///
    /// This is the explicit startup registration: it consumes the router,
    /// spawns the dispatch task and returns the handle that controls it.
    /// Must be called inside a Tokio runtime.
    pub fn register<O>(self, observer: O) -> RouterHandle
    where
        O: LifecycleObserver + InterruptObserver,
    {
        let (stats_tx, stats_rx) = watch::channel(RouterStats::default());
        let mut tasks = JoinSet::new();
        tasks.spawn(Self::dispatch(observer, self.event_rx, stats_tx));
        info!("event router started");

        RouterHandle {
            event_tx: self.event_tx,
            stats_rx,
            tasks,
        }
    }

    async fn dispatch<O>(
        observer: O,
        mut event_rx: mpsc::Receiver<DriverEvent>,
        stats_tx: watch::Sender<RouterStats>,
    ) -> Result<()>
    where
        O: LifecycleObserver + InterruptObserver,
    {
        while let Some(event) = event_rx.recv().await {
            trace!(?event, "dispatching event");

            let disposition = match event {
                DriverEvent::Lifecycle(lifecycle) => {
                    let disposition = observer.on_lifecycle(lifecycle).await;
                    debug!(event = %lifecycle, ?disposition, "lifecycle event handled");
                    Some(disposition)
                }
                DriverEvent::Announcement(announcement) => {
                    observer.on_announcement(announcement).await;
                    None
                }
                DriverEvent::Interrupt => {
                    observer.on_interrupt().await;
                    None
                }
            };

            stats_tx.send_modify(|stats| stats.record(&event, disposition));
        }

        debug!("event channel closed, router stopping");
        Ok(())
    }
}

/// Handle to a running router.
pub struct RouterHandle {
    /// Sender kept for external sources.
    event_tx: EventSender,

    /// Latest counters published by the router task.
    stats_rx: watch::Receiver<RouterStats>,

    /// Running dispatch task.
    tasks: JoinSet<Result<()>>,
}

impl RouterHandle {
    /// Sender for queuing events to the router.
    pub fn sender(&self) -> EventSender {
        self.event_tx.clone()
    }

    /// Snapshot of the router counters.
    pub fn stats(&self) -> RouterStats {
        *self.stats_rx.borrow()
    }

    /// Wait until the counters satisfy `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ChannelClosed`] if the router task ended before
    /// the predicate held.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&RouterStats) -> bool,
    ) -> Result<RouterStats> {
        self.stats_rx
            .wait_for(|stats| predicate(stats))
            .await
            .map(|stats| *stats)
            .map_err(|_| DriverError::ChannelClosed)
    }

    /// Stop the dispatch task.
    ///
    /// Events still queued are dropped. A running deferred initialization is
    /// not affected. Returns the final counters.
    ///
    /// # Errors
    ///
    /// Never fails today; task errors and panics are logged.
    pub async fn shutdown(mut self) -> Result<RouterStats> {
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match Self::classify_task_result(result) {
                TaskTermination::Success | TaskTermination::Cancelled => {}
                TaskTermination::Error => error_count += 1,
                TaskTermination::Panic => panic_count += 1,
            }
        }

        if error_count + panic_count > 0 {
            warn!(error_count, panic_count, "router task ended abnormally");
        }

        let stats = self.stats();
        info!(events = stats.events_handled, "event router stopped");
        Ok(stats)
    }

    fn classify_task_result(
        result: std::result::Result<Result<()>, tokio::task::JoinError>,
    ) -> TaskTermination {
        match result {
            Ok(Ok(())) => TaskTermination::Success,
            Ok(Err(_)) => TaskTermination::Error,
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(_) => TaskTermination::Panic,
        }
    }
}

/// Task termination classification for shutdown handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    Success,
    Error,
    Cancelled,
    Panic,
}
