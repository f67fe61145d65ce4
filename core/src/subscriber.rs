//! # Subscriber worker runtime
//!
//! Every component that reacts to events (the strategy runtime, the
//! simulated broker, the run recorder) owns one dedicated OS thread with
//! a FIFO inbox. This is a deliberate departure from the teacher's
//! single-`Engine`-draining-a-stream model: here, every subscriber
//! advances independently and the only synchronization point is the idle
//! barrier, because a bar-driven backtest must guarantee every subscriber
//! has reacted to timestamp *t* before the datafeed produces *t+1*.
//!
//! [`Subscriber`] is the trait component authors implement — one method,
//! `on_event`, plus optional exception and cleanup hooks. [`SubscriberWorker`]
//! is the plumbing: it owns the thread, the inbox, and the idle barrier,
//! and implements [`crate::bus::EventSink`] so it can be registered with an
//! [`crate::bus::EventBus`] directly.

use crate::bus::{EventBus, EventSink, SubscriberId};
use crate::events::Event;
use parking_lot::{Condvar, Mutex};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::error;

/// Component-level event handling logic, independent of threading concerns.
///
/// Implementations run inside the worker thread [`SubscriberWorker`] spawns
/// for them; `on_event` should not block on anything other than its own
/// work, since a slow handler delays the idle barrier for every other
/// subscriber waiting on `wait_until_system_idle`.
pub trait Subscriber: Send {
    /// Name used for the worker thread and in log/error messages.
    fn name(&self) -> &str;

    /// Handle one event. Panicking here is caught by the worker loop and
    /// routed to [`Subscriber::on_exception`]; it does not crash the
    /// worker thread or the process.
    fn on_event(&mut self, event: Event);

    /// Called after `on_event` panics. Default is a log line; override to
    /// take recovery action.
    fn on_exception(&mut self, message: &str) {
        error!(subscriber = self.name(), %message, "subscriber handler panicked");
    }

    /// Called once after the worker loop exits, before the thread joins.
    fn cleanup(&mut self) {}
}

/// Tracks how many events have been delivered to a subscriber but not yet
/// finished processing — queued plus in-flight. `wait_until_idle` blocks
/// until this reaches zero, mirroring `queue.Queue.join()`'s
/// unfinished-tasks counter.
#[derive(Default)]
struct IdleBarrier {
    unfinished: Mutex<usize>,
    idle: Condvar,
}

impl IdleBarrier {
    fn mark_queued(&self) {
        *self.unfinished.lock() += 1;
    }

    fn mark_done(&self) {
        let mut count = self.unfinished.lock();
        debug_assert!(*count > 0);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.unfinished.lock();
        while *count != 0 {
            self.idle.wait(&mut count);
        }
    }
}

enum Inbox {
    Event(Event),
    Shutdown,
}

/// Owns a subscriber's dedicated worker thread, bounded-nothing FIFO
/// inbox (an unbounded `mpsc::Sender`, matching the unbounded
/// `queue.Queue()` this is grounded on), and idle barrier.
pub struct SubscriberWorker {
    name: String,
    sender: mpsc::Sender<Inbox>,
    idle: Arc<IdleBarrier>,
    thread: Mutex<Option<JoinHandle<()>>>,
    running: std::sync::atomic::AtomicBool,
    registration: Mutex<Option<(EventBus, SubscriberId)>>,
}

impl std::fmt::Debug for SubscriberWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberWorker")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SubscriberWorker {
    /// Spawn `subscriber` onto its own OS thread and return the handle
    /// used to deliver events to it and later shut it down.
    ///
    /// The returned `Arc<SubscriberWorker>` can be registered with an
    /// [`crate::bus::EventBus`] via [`crate::bus::EventBus::subscribe`],
    /// since it implements [`EventSink`].
    pub fn spawn(mut subscriber: impl Subscriber + 'static) -> Arc<Self> {
        let name = subscriber.name().to_string();
        let (sender, receiver) = mpsc::channel::<Inbox>();
        let idle = Arc::new(IdleBarrier::default());
        let idle_for_thread = idle.clone();
        let thread_name = name.clone();

        let thread = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                for message in receiver {
                    match message {
                        Inbox::Event(event) => {
                            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                subscriber.on_event(event);
                            }));
                            if let Err(payload) = result {
                                let message = panic_message(&payload);
                                subscriber.on_exception(&message);
                            }
                            idle_for_thread.mark_done();
                        }
                        Inbox::Shutdown => {
                            idle_for_thread.mark_done();
                            break;
                        }
                    }
                }
                subscriber.cleanup();
            })
            .expect("failed to spawn subscriber worker thread");

        Arc::new(Self {
            name,
            sender,
            idle,
            thread: Mutex::new(Some(thread)),
            running: std::sync::atomic::AtomicBool::new(true),
            registration: Mutex::new(None),
        })
    }

    /// Record the bus and id this worker was registered under, so
    /// [`SubscriberWorker::shutdown`] can unsubscribe itself. Call this
    /// right after [`crate::bus::EventBus::subscribe`] returns.
    pub fn register_with_bus(&self, bus: EventBus, id: SubscriberId) {
        *self.registration.lock() = Some((bus, id));
    }

    /// Idempotently stop the worker: unsubscribe from the bus (if
    /// registered), send the poison pill, wait for the thread to exit, and
    /// join it. Safe to call more than once.
    pub fn shutdown(&self) {
        use std::sync::atomic::Ordering;
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        if let Some((bus, id)) = self.registration.lock().take() {
            bus.unsubscribe(id);
        }
        self.idle.mark_queued();
        let _ = self.sender.send(Inbox::Shutdown);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl EventSink for SubscriberWorker {
    fn deliver(&self, event: Event) {
        if !self.running.load(std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        self.idle.mark_queued();
        if self.sender.send(Inbox::Event(event)).is_err() {
            // Worker thread already exited; undo the bookkeeping increment
            // so a concurrent wait_until_idle does not block forever.
            self.idle.mark_done();
        }
    }

    fn wait_until_idle(&self) {
        if !self.running.load(std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        self.idle.wait();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BarReceived;
    use crate::model::BarPeriod;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSubscriber {
        name: &'static str,
        count: Arc<AtomicUsize>,
    }

    impl Subscriber for CountingSubscriber {
        fn name(&self) -> &str {
            self.name
        }

        fn on_event(&mut self, _event: Event) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_bar() -> Event {
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
        .into()
    }

    #[test]
    fn wait_until_idle_blocks_until_event_processed() {
        let count = Arc::new(AtomicUsize::new(0));
        let worker = SubscriberWorker::spawn(CountingSubscriber {
            name: "counter",
            count: count.clone(),
        });

        worker.deliver(sample_bar());
        worker.wait_until_idle();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        worker.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent() {
        let worker = SubscriberWorker::spawn(CountingSubscriber {
            name: "counter",
            count: Arc::new(AtomicUsize::new(0)),
        });
        worker.shutdown();
        worker.shutdown();
    }

    struct PanickingSubscriber {
        exceptions: Arc<AtomicUsize>,
    }

    impl Subscriber for PanickingSubscriber {
        fn name(&self) -> &str {
            "panicker"
        }

        fn on_event(&mut self, _event: Event) {
            panic!("boom");
        }

        fn on_exception(&mut self, _message: &str) {
            self.exceptions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn panicking_handler_is_routed_to_on_exception_and_worker_survives() {
        let exceptions = Arc::new(AtomicUsize::new(0));
        let worker = SubscriberWorker::spawn(PanickingSubscriber {
            exceptions: exceptions.clone(),
        });

        worker.deliver(sample_bar());
        worker.wait_until_idle();
        assert_eq!(exceptions.load(Ordering::SeqCst), 1);

        // worker thread is still alive and can process another event
        worker.deliver(sample_bar());
        worker.wait_until_idle();
        assert_eq!(exceptions.load(Ordering::SeqCst), 2);

        worker.shutdown();
    }
}
