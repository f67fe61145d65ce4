//! # Event bus
//!
//! A type-indexed publish/subscribe router. Subscription is keyed on
//! [`crate::events::EventKind`] rather than a runtime class hierarchy:
//! there is no notion of subscribing to a supertype and receiving every
//! subtype, because this taxonomy has no supertypes. `publish` takes the
//! subscriber-set lock just long enough to clone the relevant set, then
//! releases it before dispatching — a publisher blocked on a slow
//! subscriber's full inbox never holds up `subscribe`/`unsubscribe` calls
//! from other threads.

use crate::error::CoreError;
use crate::events::{Event, EventKind};
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a registered subscriber, assigned at subscription time.
///
/// Opaque and only meaningful for equality/set-membership; carries no
/// information about the subscriber itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

impl SubscriberId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The bus's view of a subscriber: deliver one event, and block until this
/// subscriber has drained everything delivered to it so far.
///
/// Implemented by [`crate::subscriber::SubscriberWorker`]; components
/// implement [`crate::subscriber::Subscriber`] instead of this trait
/// directly.
pub trait EventSink: Send + Sync {
    /// Enqueue `event` for this subscriber's worker thread. Must not block
    /// the caller on the subscriber's own processing of the event.
    fn deliver(&self, event: Event);

    /// Block until every event delivered to this subscriber so far —
    /// queued or currently in flight — has finished processing.
    fn wait_until_idle(&self);

    /// Human-readable name used in logs and error messages.
    fn name(&self) -> &str;
}

struct Inner {
    subscribers: IndexMap<SubscriberId, Arc<dyn EventSink>>,
    per_event: IndexMap<EventKind, IndexSet<SubscriberId>>,
}

/// Central pub/sub router shared by every component in a backtest run.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                subscribers: IndexMap::new(),
                per_event: IndexMap::new(),
            })),
        }
    }

    /// Register `sink` to receive every event whose kind is in `kinds`.
    ///
    /// Returns the [`SubscriberId`] to pass to [`EventBus::unsubscribe`].
    pub fn subscribe(&self, sink: Arc<dyn EventSink>, kinds: &[EventKind]) -> SubscriberId {
        let id = SubscriberId::next();
        let mut inner = self.inner.lock();
        inner.subscribers.insert(id, sink);
        for kind in kinds {
            inner.per_event.entry(*kind).or_default().insert(id);
        }
        id
    }

    /// Remove a subscriber from every event kind it was registered for.
    ///
    /// Idempotent: unsubscribing an id that is already gone is a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock();
        inner.subscribers.shift_remove(&id);
        for set in inner.per_event.values_mut() {
            set.shift_remove(&id);
        }
    }

    /// Deliver `event` to every subscriber registered for its kind.
    ///
    /// Subscribers are dispatched in registration order. A subscriber
    /// whose inbox is unbounded and never blocks, so this never waits on
    /// subscriber processing — only on acquiring the bus lock briefly to
    /// copy the subscriber set.
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let kind = event.kind();
        let sinks: Vec<Arc<dyn EventSink>> = {
            let inner = self.inner.lock();
            match inner.per_event.get(&kind) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| inner.subscribers.get(id).cloned())
                    .collect(),
                None => Vec::new(),
            }
        };
        for sink in sinks {
            sink.deliver(event.clone());
        }
    }

    /// Like [`EventBus::publish`], but errors if nobody is registered for
    /// `event`'s kind instead of silently dropping it.
    pub fn publish_checked(&self, event: impl Into<Event>) -> Result<(), CoreError> {
        let event = event.into();
        let kind = event.kind();
        if self.subscriber_count(kind) == 0 {
            return Err(CoreError::NoSubscribers(kind));
        }
        self.publish(event);
        Ok(())
    }

    /// Number of subscribers currently registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner
            .lock()
            .per_event
            .get(&kind)
            .map(IndexSet::len)
            .unwrap_or(0)
    }

    /// Block until every currently-registered subscriber has drained its
    /// inbox and finished processing whatever was in flight.
    ///
    /// This is the barrier the datafeed calls between timestamp batches to
    /// guarantee every strategy has reacted to bar *t* before bar *t+1* is
    /// produced — the mechanism that rules out look-ahead bias.
    pub fn wait_until_system_idle(&self) {
        let sinks: Vec<Arc<dyn EventSink>> = {
            let inner = self.inner.lock();
            inner.subscribers.values().cloned().collect()
        };
        for sink in sinks {
            sink.wait_until_idle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BarReceived;
    use crate::model::BarPeriod;
    use parking_lot::Mutex as PMutex;

    struct RecordingSink {
        name: String,
        received: PMutex<Vec<Event>>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, event: Event) {
            self.received.lock().push(event);
        }

        fn wait_until_idle(&self) {}

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn sample_bar() -> BarReceived {
        BarReceived {
            ts_event_ns: 0,
            ts_created_ns: 0,
            symbol: "AAPL".into(),
            bar_period: BarPeriod::Minute,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: None,
        }
    }

    #[test]
    fn publish_only_reaches_subscribers_of_that_kind() {
        let bus = EventBus::new();
        let bars = Arc::new(RecordingSink {
            name: "bars".into(),
            received: PMutex::new(Vec::new()),
        });
        let fills = Arc::new(RecordingSink {
            name: "fills".into(),
            received: PMutex::new(Vec::new()),
        });
        bus.subscribe(bars.clone(), &[EventKind::BarReceived]);
        bus.subscribe(fills.clone(), &[EventKind::FillEvent]);

        bus.publish(sample_bar());

        assert_eq!(bars.received.lock().len(), 1);
        assert_eq!(fills.received.lock().len(), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let sink = Arc::new(RecordingSink {
            name: "sink".into(),
            received: PMutex::new(Vec::new()),
        });
        let id = bus.subscribe(sink.clone(), &[EventKind::BarReceived]);
        bus.unsubscribe(id);

        bus.publish(sample_bar());

        assert_eq!(sink.received.lock().len(), 0);
    }

    #[test]
    fn publish_checked_errors_with_no_subscribers() {
        let bus = EventBus::new();
        let err = bus.publish_checked(sample_bar()).unwrap_err();
        assert!(matches!(err, CoreError::NoSubscribers(EventKind::BarReceived)));
    }
}
