//! Event bus for IFX services
//!
//! Services define their own event enum and broadcast it through an
//! [`EventBus`]. Subscribers (SSE streams, tests, loggers) each receive every
//! event emitted after they subscribed.

use tokio::sync::broadcast;

/// Event payload carried by an [`EventBus`]
///
/// `event_type` names the variant; SSE streams use it as the event name.
pub trait BusEvent: Clone + Send + 'static {
    fn event_type(&self) -> &'static str;
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use ifx_common::events::{BusEvent, EventBus};
///
/// #[derive(Clone, Debug)]
/// struct Ping;
///
/// impl BusEvent for Ping {
///     fn event_type(&self) -> &'static str {
///         "Ping"
///     }
/// }
///
/// let bus: EventBus<Ping> = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit(Ping).ok();
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus<E: BusEvent> {
    tx: broadcast::Sender<E>,
    capacity: usize,
}

impl<E: BusEvent> EventBus<E> {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped for that subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: E) -> Result<usize, broadcast::error::SendError<E>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: E) {
        let event_type = event.event_type();
        if self.tx.send(event).is_err() {
            tracing::trace!(event_type, "No subscribers for event");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
