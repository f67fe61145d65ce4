//! The subscriber that turns a [`Strategy`] into a running component: bar
//! demultiplexing, indicator fan-out, `BarProcessed` composition, and the
//! order/fill bookkeeping that backs `ctx.position()`/`ctx.avg_price()`.

use crate::context::{OhlcvHandles, StrategyContext, StrategyState};
use crate::strategy::Strategy;
use indexmap::IndexMap;
use tidemark_core::bus::EventBus;
use tidemark_core::clock::now_ns;
use tidemark_core::events::{BarProcessed, BarReceived, Event, EventKind};
use tidemark_core::model::TradeSide;
use tidemark_core::subscriber::Subscriber;
use tracing::warn;

/// Event kinds a strategy runtime must be subscribed to on the bus.
pub const SUBSCRIBED_EVENT_KINDS: &[EventKind] = &[
    EventKind::BarReceived,
    EventKind::OrderAccepted,
    EventKind::ModificationAccepted,
    EventKind::CancellationAccepted,
    EventKind::OrderRejected,
    EventKind::ModificationRejected,
    EventKind::CancellationRejected,
    EventKind::FillEvent,
    EventKind::OrderExpired,
];

/// The names of the five built-in OHLCV passthrough indicators, excluded
/// from `BarProcessed.indicators` because they are already present as
/// plain OHLCV fields on the event.
const OHLCV_NAMES: [&str; 5] = ["OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"];

/// Wraps a [`Strategy`] with the bookkeeping and bus plumbing it needs to
/// run as an [`EventSink`](tidemark_core::bus::EventSink) subscriber.
pub struct StrategyRuntime<S: Strategy> {
    strategy: S,
    state: StrategyState,
    bus: EventBus,
}

impl<S: Strategy> std::fmt::Debug for StrategyRuntime<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRuntime").field("name", &self.strategy.name()).finish_non_exhaustive()
    }
}

impl<S: Strategy> StrategyRuntime<S> {
    /// Build a runtime for `strategy`, registering the built-in OHLCV
    /// indicators and then calling `strategy.setup` to register its own.
    pub fn new(bus: EventBus, mut strategy: S, ohlcv: OhlcvHandles) -> Self {
        let mut state = StrategyState::new(ohlcv);
        {
            let mut ctx = StrategyContext { state: &mut state, bus: &bus };
            strategy.setup(&mut ctx);
        }
        Self { strategy, state, bus }
    }

    fn on_bar_received(&mut self, bar: BarReceived) {
        if !self.strategy.symbols().iter().any(|s| s.as_str() == bar.symbol.as_str()) {
            return;
        }
        if bar.bar_period != self.strategy.bar_period() {
            return;
        }

        self.state.current_symbol = bar.symbol.clone();
        self.state.current_ts_ns = bar.ts_event_ns;

        for indicator in &self.state.indicators {
            indicator.update(&bar);
        }

        self.emit_processed_bar(&bar);

        let mut ctx = StrategyContext { state: &mut self.state, bus: &self.bus };
        self.strategy.on_bar(&mut ctx, &bar);
    }

    fn emit_processed_bar(&self, bar: &BarReceived) {
        let mut indicator_values = IndexMap::new();
        for indicator in &self.state.indicators {
            let name = indicator.name();
            if OHLCV_NAMES.contains(&name.as_str()) {
                continue;
            }
            let key = format!("{:02}_{}", indicator.plot_at(), name);
            indicator_values.insert(key, indicator.latest(&bar.symbol));
        }

        let processed = BarProcessed {
            ts_event_ns: bar.ts_event_ns,
            ts_created_ns: now_ns(),
            symbol: bar.symbol.clone(),
            bar_period: bar.bar_period,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            indicators: indicator_values,
        };
        self.bus.publish(processed);
    }

    fn update_position(&mut self, symbol: &str, side: TradeSide, fill_qty: f64, fill_price: f64) {
        let signed_qty = match side {
            TradeSide::Buy => fill_qty,
            TradeSide::Sell => -fill_qty,
        };

        let old_pos = self.state.positions.get(symbol).copied().unwrap_or(0.0);
        let old_avg = self.state.avg_prices.get(symbol).copied().unwrap_or(0.0);
        let new_pos = old_pos + signed_qty;

        let new_avg = if new_pos == 0.0 {
            0.0
        } else if old_pos == 0.0 {
            fill_price
        } else if (old_pos > 0.0 && signed_qty > 0.0) || (old_pos < 0.0 && signed_qty < 0.0) {
            (old_avg * old_pos.abs() + fill_price * signed_qty.abs()) / new_pos.abs()
        } else if new_pos.abs() <= old_pos.abs() {
            old_avg
        } else {
            fill_price
        };

        self.state.positions.insert(symbol.into(), new_pos);
        self.state.avg_prices.insert(symbol.into(), new_avg);
    }
}

impl<S: Strategy> Subscriber for StrategyRuntime<S> {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::BarReceived(bar) => self.on_bar_received(bar),
            Event::OrderAccepted(accepted) => {
                if let Some(order) = self.state.submitted_orders.shift_remove(&accepted.associated_order_id) {
                    self.state.pending_orders.insert(accepted.associated_order_id, order);
                }
            }
            Event::ModificationAccepted(accepted) => {
                if let Some(order) = self.state.submitted_modifications.shift_remove(&accepted.associated_order_id) {
                    self.state.pending_orders.insert(accepted.associated_order_id, order);
                }
            }
            Event::CancellationAccepted(accepted) => {
                self.state.submitted_cancellations.shift_remove(&accepted.associated_order_id);
                self.state.pending_orders.shift_remove(&accepted.associated_order_id);
            }
            Event::OrderRejected(rejected) => {
                self.state.submitted_orders.shift_remove(&rejected.associated_order_id);
            }
            Event::ModificationRejected(rejected) => {
                self.state.submitted_modifications.shift_remove(&rejected.associated_order_id);
            }
            Event::CancellationRejected(rejected) => {
                self.state.submitted_cancellations.shift_remove(&rejected.associated_order_id);
            }
            Event::FillEvent(fill) => {
                if let Some(order) = self.state.pending_orders.get_mut(&fill.associated_order_id) {
                    order.filled_quantity += fill.quantity_filled;
                    if order.filled_quantity >= order.quantity {
                        self.state.pending_orders.shift_remove(&fill.associated_order_id);
                    }
                }

                let record = crate::records::FillRecord {
                    fill_id: fill.fill_id,
                    order_id: fill.associated_order_id,
                    symbol: fill.symbol.clone(),
                    side: fill.side,
                    quantity: fill.quantity_filled,
                    price: fill.fill_price,
                    commission: fill.commission,
                    ts_event_ns: fill.ts_event_ns,
                };
                self.state.fills.entry(fill.symbol.clone()).or_default().push(record);

                self.update_position(&fill.symbol, fill.side, fill.quantity_filled, fill.fill_price);
            }
            Event::OrderExpired(expired) => {
                self.state.pending_orders.shift_remove(&expired.associated_order_id);
            }
            other => {
                warn!(strategy = self.strategy.name(), kind = ?other.kind(), "strategy runtime received an unhandled event kind");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;
    use tidemark_core::events::FillEvent;
    use tidemark_core::ids::{FillId, SystemOrderId};
    use tidemark_core::model::BarPeriod;
    use tidemark_indicators::bar::{Close, High, Low, Open, Volume};

    struct NoopStrategy {
        symbols: Vec<SmolStr>,
        bar_period: BarPeriod,
    }

    impl Strategy for NoopStrategy {
        fn name(&self) -> &str {
            "noop"
        }

        fn symbols(&self) -> &[SmolStr] {
            &self.symbols
        }

        fn bar_period(&self) -> BarPeriod {
            self.bar_period
        }

        fn on_bar(&mut self, _ctx: &mut StrategyContext<'_>, _event: &BarReceived) {}
    }

    fn ohlcv_handles() -> OhlcvHandles {
        OhlcvHandles {
            open: std::sync::Arc::new(Open::default()),
            high: std::sync::Arc::new(High::default()),
            low: std::sync::Arc::new(Low::default()),
            close: std::sync::Arc::new(Close::default()),
            volume: std::sync::Arc::new(Volume::default()),
        }
    }

    fn make_runtime() -> StrategyRuntime<NoopStrategy> {
        let bus = EventBus::new();
        let strategy = NoopStrategy { symbols: vec!["AAPL".into()], bar_period: BarPeriod::Minute };
        StrategyRuntime::new(bus, strategy, ohlcv_handles())
    }

    fn fill(symbol: &str, side: TradeSide, quantity: f64, price: f64) -> FillEvent {
        FillEvent {
            ts_event_ns: 0,
            ts_created_ns: 0,
            ts_broker_ns: 0,
            fill_id: FillId::new(),
            broker_fill_id: None,
            associated_order_id: SystemOrderId::new(),
            broker_order_id: None,
            symbol: symbol.into(),
            side,
            quantity_filled: quantity,
            fill_price: price,
            commission: 0.0,
            exchange: "SIM".into(),
        }
    }

    #[test]
    fn opening_a_flat_position_sets_avg_to_fill_price() {
        let mut runtime = make_runtime();
        runtime.update_position("AAPL", TradeSide::Buy, 10.0, 100.0);
        assert_eq!(runtime.state.positions["AAPL"], 10.0);
        assert_eq!(runtime.state.avg_prices["AAPL"], 100.0);
    }

    #[test]
    fn adding_to_a_position_weight_averages_price() {
        let mut runtime = make_runtime();
        runtime.update_position("AAPL", TradeSide::Buy, 10.0, 100.0);
        runtime.update_position("AAPL", TradeSide::Buy, 10.0, 110.0);
        assert_eq!(runtime.state.positions["AAPL"], 20.0);
        assert_eq!(runtime.state.avg_prices["AAPL"], 105.0);
    }

    #[test]
    fn partial_reduce_keeps_average_price() {
        let mut runtime = make_runtime();
        runtime.update_position("AAPL", TradeSide::Buy, 10.0, 100.0);
        runtime.update_position("AAPL", TradeSide::Sell, 4.0, 120.0);
        assert_eq!(runtime.state.positions["AAPL"], 6.0);
        assert_eq!(runtime.state.avg_prices["AAPL"], 100.0);
    }

    #[test]
    fn flattening_resets_average_price_to_zero() {
        let mut runtime = make_runtime();
        runtime.update_position("AAPL", TradeSide::Buy, 10.0, 100.0);
        runtime.update_position("AAPL", TradeSide::Sell, 10.0, 120.0);
        assert_eq!(runtime.state.positions["AAPL"], 0.0);
        assert_eq!(runtime.state.avg_prices["AAPL"], 0.0);
    }

    #[test]
    fn flipping_through_zero_resets_average_to_new_fill_price() {
        let mut runtime = make_runtime();
        runtime.update_position("AAPL", TradeSide::Buy, 10.0, 100.0);
        runtime.update_position("AAPL", TradeSide::Sell, 15.0, 90.0);
        assert_eq!(runtime.state.positions["AAPL"], -5.0);
        assert_eq!(runtime.state.avg_prices["AAPL"], 90.0);
    }

    #[test]
    fn bar_for_unsubscribed_symbol_is_ignored() {
        let mut runtime = make_runtime();
        let bar = BarReceived {
            ts_event_ns: 1,
            ts_created_ns: 1,
            symbol: "MSFT".into(),
            bar_period: BarPeriod::Minute,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: None,
        };
        runtime.on_event(Event::BarReceived(bar));
        assert_eq!(runtime.state.current_symbol.as_str(), "");
    }

    #[test]
    fn fill_event_updates_position_and_appends_fill_record() {
        let mut runtime = make_runtime();
        runtime.on_event(Event::FillEvent(fill("AAPL", TradeSide::Buy, 5.0, 50.0)));
        assert_eq!(runtime.state.positions["AAPL"], 5.0);
        assert_eq!(runtime.state.fills["AAPL"].len(), 1);
    }
}
