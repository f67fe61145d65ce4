//! The timestamp-batched producer thread that drives a backtest.
//!
//! [`SimulatedDatafeed`] queries the catalog for every subscribed
//! `(symbol, bar_period)` pair once [`SimulatedDatafeed::wait_until_complete`]
//! is called, merges the results into one ascending-timestamp stream,
//! and publishes a `BarReceived` per bar — but only after grouping bars
//! that share an identical timestamp into one batch and calling
//! `EventBus::wait_until_system_idle` between batches. That barrier is
//! what rules out look-ahead bias: every subscriber has fully reacted to
//! everything timestamped *t* before any bar timestamped *t+1* is
//! published.

use crate::catalog::Catalog;
use crate::error::DataError;
use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tidemark_core::bus::EventBus;
use tidemark_core::clock::now_ns;
use tidemark_core::events::BarReceived;
use tidemark_core::model::BarPeriod;

/// Drives a backtest from a [`Catalog`] rather than a live market
/// connection. `connect`/`disconnect`/`subscribe`/`wait_until_complete`
/// mirror the lifecycle every datafeed implementation exposes to the
/// orchestrator, so a live datafeed could stand in for this one without
/// changing orchestration code.
pub struct SimulatedDatafeed {
    bus: EventBus,
    catalog: Option<Catalog>,
    subscriptions: IndexMap<BarPeriod, IndexSet<SmolStr>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), DataError>>>,
    connected: bool,
}

impl std::fmt::Debug for SimulatedDatafeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedDatafeed").field("connected", &self.connected).finish_non_exhaustive()
    }
}

impl SimulatedDatafeed {
    pub fn new(bus: EventBus, catalog: Catalog) -> Self {
        Self {
            bus,
            catalog: Some(catalog),
            subscriptions: IndexMap::new(),
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
            connected: false,
        }
    }

    /// No-op lifecycle hook; a simulated datafeed has no connection to
    /// establish beyond the catalog already being open.
    pub fn connect(&mut self) -> Result<(), DataError> {
        self.connected = true;
        Ok(())
    }

    /// Register `symbols` to be streamed at `bar_period`. Accumulates
    /// across calls; the same symbol can be added to more than one bar
    /// period by calling this once per period.
    pub fn subscribe(&mut self, symbols: Vec<SmolStr>, bar_period: BarPeriod) {
        let set = self.subscriptions.entry(bar_period).or_default();
        for symbol in symbols {
            set.insert(symbol);
        }
    }

    /// Query the catalog for the full subscription set, then stream every
    /// matching bar in non-decreasing timestamp order, batching bars that
    /// share a timestamp and waiting for the system to go idle between
    /// batches. Blocks until the stream is exhausted or [`SimulatedDatafeed::disconnect`]
    /// signals it to stop early.
    pub fn wait_until_complete(&mut self) -> Result<(), DataError> {
        if !self.connected {
            return Err(DataError::NotConnected);
        }
        let Some(catalog) = self.catalog.take() else {
            return self.join_producer();
        };

        let mut rows: Vec<(i64, SmolStr, BarPeriod, f64, f64, f64, f64, Option<i64>)> = Vec::new();
        for (bar_period, symbols) in &self.subscriptions {
            for symbol in symbols {
                for bar in catalog.bars_for_symbol(symbol, *bar_period)? {
                    rows.push((bar.ts_event_ns, symbol.clone(), *bar_period, bar.open, bar.high, bar.low, bar.close, bar.volume));
                }
            }
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let bus = self.bus.clone();
        let stop = self.stop.clone();
        let thread = std::thread::Builder::new()
            .name("simulated-datafeed".to_string())
            .spawn(move || -> Result<(), DataError> {
                let mut index = 0;
                while index < rows.len() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let batch_ts = rows[index].0;
                    let mut end = index;
                    while end < rows.len() && rows[end].0 == batch_ts {
                        end += 1;
                    }
                    for (ts_event_ns, symbol, bar_period, open, high, low, close, volume) in &rows[index..end] {
                        bus.publish(BarReceived {
                            ts_event_ns: *ts_event_ns,
                            ts_created_ns: now_ns(),
                            symbol: symbol.clone(),
                            bar_period: *bar_period,
                            open: *open,
                            high: *high,
                            low: *low,
                            close: *close,
                            volume: *volume,
                        });
                    }
                    bus.wait_until_system_idle();
                    index = end;
                }
                Ok(())
            })
            .expect("failed to spawn datafeed producer thread");

        self.thread = Some(thread);
        self.join_producer()
    }

    /// Signal the producer thread to stop after its current batch and
    /// join it. Safe to call even if the stream already finished or
    /// never started.
    pub fn disconnect(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.join_producer();
        self.connected = false;
    }

    fn join_producer(&mut self) -> Result<(), DataError> {
        if let Some(handle) = self.thread.take() {
            return handle.join().expect("datafeed producer thread panicked");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tidemark_core::bus::EventSink;
    use tidemark_core::events::{Event, EventKind};
    use tidemark_core::model::BarPeriod;

    struct RecordingSink {
        received: Mutex<Vec<BarReceived>>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, event: Event) {
            if let Event::BarReceived(bar) = event {
                self.received.lock().push(bar);
            }
        }

        fn wait_until_idle(&self) {}

        fn name(&self) -> &str {
            "recording-sink"
        }
    }

    fn seeded_catalog() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        let publisher_id = catalog.insert_publisher("DATABENTO", "XNAS.ITCH", None).unwrap();
        let aapl = catalog.insert_instrument(publisher_id, "AAPL").unwrap();
        let msft = catalog.insert_instrument(publisher_id, "MSFT").unwrap();
        catalog.insert_bar_unscaled(aapl, BarPeriod::Minute, 200, 10.0, 10.0, 10.0, 10.0, None).unwrap();
        catalog.insert_bar_unscaled(msft, BarPeriod::Minute, 100, 20.0, 20.0, 20.0, 20.0, None).unwrap();
        catalog.insert_bar_unscaled(msft, BarPeriod::Minute, 200, 21.0, 21.0, 21.0, 21.0, None).unwrap();
        catalog
    }

    #[test]
    fn bars_from_multiple_symbols_are_merged_by_timestamp() {
        let bus = EventBus::new();
        let sink = std::sync::Arc::new(RecordingSink { received: Mutex::new(Vec::new()) });
        bus.subscribe(sink.clone(), &[EventKind::BarReceived]);

        let mut datafeed = SimulatedDatafeed::new(bus, seeded_catalog());
        datafeed.connect().unwrap();
        datafeed.subscribe(vec!["AAPL".into(), "MSFT".into()], BarPeriod::Minute);
        datafeed.wait_until_complete().unwrap();

        let received = sink.received.lock();
        assert_eq!(received.len(), 3);
        assert_eq!(received[0].symbol.as_str(), "MSFT");
        assert_eq!(received[0].ts_event_ns, 100);
        assert_eq!(received[1].ts_event_ns, 200);
        assert_eq!(received[2].ts_event_ns, 200);
    }

    #[test]
    fn wait_until_complete_before_connect_errors() {
        let bus = EventBus::new();
        let mut datafeed = SimulatedDatafeed::new(bus, seeded_catalog());
        assert!(matches!(datafeed.wait_until_complete(), Err(DataError::NotConnected)));
    }

    #[test]
    fn disconnect_without_ever_streaming_is_a_no_op() {
        let bus = EventBus::new();
        let mut datafeed = SimulatedDatafeed::new(bus, seeded_catalog());
        datafeed.disconnect();
    }

    #[test]
    fn unsubscribed_symbol_never_publishes() {
        let bus = EventBus::new();
        let sink = std::sync::Arc::new(RecordingSink { received: Mutex::new(Vec::new()) });
        bus.subscribe(sink.clone(), &[EventKind::BarReceived]);

        let mut datafeed = SimulatedDatafeed::new(bus, seeded_catalog());
        datafeed.connect().unwrap();
        datafeed.subscribe(vec!["AAPL".into()], BarPeriod::Minute);
        datafeed.wait_until_complete().unwrap();

        let received = sink.received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].symbol.as_str(), "AAPL");
    }
}
