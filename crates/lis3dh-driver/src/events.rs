//! Event delivery.
//!
//! Lifecycle notifications, the driver's own announcements and interrupt
//! callbacks all travel as [`DriverEvent`]s on one bounded channel, so the
//! router sees them in the order they were raised. Observers implement the
//! capability traits [`LifecycleObserver`] and [`InterruptObserver`].

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{trace, warn};

use lis3dh_core::{Announcement, DriverError, LifecycleEvent, Result};
use lis3dh_hal::InterruptCallback;

/// Event delivered to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverEvent {
    /// System-wide lifecycle notification.
    Lifecycle(LifecycleEvent),

    /// Module state announcement looped back from the publisher.
    Announcement(Announcement),

    /// The sensor's interrupt line asserted.
    Interrupt,
}

impl From<LifecycleEvent> for DriverEvent {
    fn from(event: LifecycleEvent) -> Self {
        Self::Lifecycle(event)
    }
}

/// What an observer did with a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Other listeners should see the event too.
    Propagate,

    /// The event is fully handled and goes no further.
    Consumed,
}

/// Capability to react to lifecycle events and module announcements.
pub trait LifecycleObserver: Send + Sync + 'static {
    /// Handle a lifecycle event.
    fn on_lifecycle(&self, event: LifecycleEvent) -> impl Future<Output = Disposition> + Send;

    /// Handle an announcement published on the lifecycle bus.
    fn on_announcement(&self, announcement: Announcement) -> impl Future<Output = ()> + Send;
}

/// Capability to react to the sensor's interrupt line.
pub trait InterruptObserver: Send + Sync + 'static {
    /// Handle one assertion of the interrupt line.
    fn on_interrupt(&self) -> impl Future<Output = ()> + Send;
}

impl<T: LifecycleObserver> LifecycleObserver for Arc<T> {
    fn on_lifecycle(&self, event: LifecycleEvent) -> impl Future<Output = Disposition> + Send {
        (**self).on_lifecycle(event)
    }

    fn on_announcement(&self, announcement: Announcement) -> impl Future<Output = ()> + Send {
        (**self).on_announcement(announcement)
    }
}

impl<T: InterruptObserver> InterruptObserver for Arc<T> {
    fn on_interrupt(&self) -> impl Future<Output = ()> + Send {
        (**self).on_interrupt()
    }
}

/// Create the bounded event channel.
///
/// # Panics
///
/// Panics if `capacity` is zero. [`DriverConfig::validate`] rejects that.
///
/// [`DriverConfig::validate`]: crate::DriverConfig::validate
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<DriverEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, rx)
}

/// Sending side of the event channel.
///
/// Cheap to clone; every external source holds its own copy.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<DriverEvent>,
}

impl EventSender {
    /// Queue an event, waiting for room in the channel.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ChannelClosed`] if the router is gone.
    pub async fn send(&self, event: impl Into<DriverEvent>) -> Result<()> {
        self.tx
            .send(event.into())
            .await
            .map_err(|_| DriverError::ChannelClosed)
    }

    /// Queue an event without waiting.
    ///
    /// Returns `false` if the channel is full or closed and the event was
    /// dropped.
    pub fn try_send(&self, event: impl Into<DriverEvent>) -> bool {
        match self.tx.try_send(event.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "event channel full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                trace!(?event, "event channel closed, dropping event");
                false
            }
        }
    }

    /// Build the callback handed to the interrupt line.
    ///
    /// The callback never blocks: if the channel is full the assertion is
    /// dropped, and the level-triggered line asserts again until the source
    /// is cleared.
    pub fn interrupt_callback(&self) -> InterruptCallback {
        let sender = self.clone();
        Arc::new(move || {
            sender.try_send(DriverEvent::Interrupt);
        })
    }

    /// Check if the router side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Publisher of the driver's module announcements.
///
/// Every announcement is broadcast to subscribers and looped back into the
/// driver's own event channel, the way a lifecycle bus delivers a module's
/// announcements to every listener including the module itself.
#[derive(Debug, Clone)]
pub struct Announcer {
    tx: broadcast::Sender<Announcement>,
    loopback: Option<EventSender>,
}

impl Announcer {
    /// Create an announcer without loopback.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, loopback: None }
    }

    /// Also deliver announcements to `events`.
    pub fn with_loopback(mut self, events: EventSender) -> Self {
        self.loopback = Some(events);
        self
    }

    /// Subscribe to announcements published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Announcement> {
        self.tx.subscribe()
    }

    /// Publish `announcement`.
    pub fn announce(&self, announcement: Announcement) {
        // No subscribers is fine
        let receivers = self.tx.send(announcement).unwrap_or(0);
        trace!(?announcement, receivers, "announced");

        if let Some(loopback) = &self.loopback {
            loopback.try_send(DriverEvent::Announcement(announcement));
        }
    }
}
