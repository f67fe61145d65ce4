//! `SimulatedBroker`: validation, the bar-driven matching engine, and
//! cancellation/modification handling.

use crate::order::{attempt_fill, validate_modification, validate_submission, OpenOrder};
use indexmap::IndexMap;
use tidemark_core::bus::EventBus;
use tidemark_core::clock::now_ns;
use tidemark_core::events::{
    BarReceived, CancellationAccepted, CancellationRejected, Event, EventKind, FillEvent, ModificationAccepted,
    ModificationRejected, OrderAccepted, OrderCancellationRequest, OrderModificationRequest, OrderRejected,
    OrderSubmissionRequest,
};
use tidemark_core::ids::FillId;
use tidemark_core::model::{CancellationRejectionReason, ModificationRejectionReason, OrderRejectionReason};
use tidemark_core::subscriber::Subscriber;

/// Event kinds a simulated broker must be subscribed to on the bus.
pub const SUBSCRIBED_EVENT_KINDS: &[EventKind] = &[
    EventKind::BarReceived,
    EventKind::OrderSubmissionRequest,
    EventKind::OrderCancellationRequest,
    EventKind::OrderModificationRequest,
];

/// A broker with no network and no matching-engine queue beyond its own
/// open-order book. Fills are always full (no partial fills) and the
/// commission charged is `max(quantity * commission_per_unit,
/// minimum_commission_per_order)`.
#[derive(Debug)]
pub struct SimulatedBroker {
    bus: EventBus,
    commission_per_unit: f64,
    minimum_commission_per_order: f64,
    open_orders: IndexMap<tidemark_core::ids::SystemOrderId, OpenOrder>,
}

impl SimulatedBroker {
    /// A broker with no commission.
    pub fn new(bus: EventBus) -> Self {
        Self::with_commission(bus, 0.0, 0.0)
    }

    /// A broker charging `max(quantity * commission_per_unit,
    /// minimum_commission_per_order)` on every fill.
    pub fn with_commission(bus: EventBus, commission_per_unit: f64, minimum_commission_per_order: f64) -> Self {
        Self { bus, commission_per_unit, minimum_commission_per_order, open_orders: IndexMap::new() }
    }

    /// No-op lifecycle hook; the simulated broker has no external
    /// connection to establish. Present so orchestration code can treat
    /// every broker implementation the same way.
    pub fn connect(&self) {}

    /// No-op lifecycle hook, the counterpart to [`SimulatedBroker::connect`].
    pub fn disconnect(&self) {}

    /// Number of orders currently open, for tests and introspection.
    pub fn open_order_count(&self) -> usize {
        self.open_orders.len()
    }

    fn commission(&self, quantity: f64) -> f64 {
        (quantity * self.commission_per_unit).max(self.minimum_commission_per_order)
    }

    fn on_bar(&mut self, bar: &BarReceived) {
        let mut fills = Vec::new();
        for (id, order) in self.open_orders.iter_mut() {
            if order.symbol.as_str() != bar.symbol.as_str() {
                continue;
            }
            if let Some(price) = attempt_fill(order, bar) {
                fills.push((*id, price));
            }
        }

        for (id, price) in fills {
            if let Some(order) = self.open_orders.shift_remove(&id) {
                self.emit_fill(&order, bar, price);
            }
        }
    }

    fn emit_fill(&self, order: &OpenOrder, bar: &BarReceived, price: f64) {
        let fill = FillEvent {
            ts_event_ns: bar.ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns: bar.ts_event_ns,
            fill_id: FillId::new(),
            broker_fill_id: None,
            associated_order_id: order.order_id,
            broker_order_id: None,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity_filled: order.quantity,
            fill_price: price,
            commission: self.commission(order.quantity),
            exchange: "SIM".into(),
        };
        self.bus.publish(fill);
    }

    fn on_submission(&mut self, request: OrderSubmissionRequest) {
        match validate_submission(&request) {
            Ok(()) => {
                let accepted = OrderAccepted {
                    ts_event_ns: request.ts_event_ns,
                    ts_created_ns: now_ns(),
                    ts_broker_ns: request.ts_event_ns,
                    associated_order_id: request.system_order_id,
                    broker_order_id: None,
                };
                self.open_orders.insert(request.system_order_id, OpenOrder::from_request(&request));
                self.bus.publish(accepted);
            }
            Err(message) => {
                let rejected = OrderRejected {
                    ts_event_ns: request.ts_event_ns,
                    ts_created_ns: now_ns(),
                    ts_broker_ns: request.ts_event_ns,
                    associated_order_id: request.system_order_id,
                    rejection_reason: OrderRejectionReason::Unknown,
                    rejection_message: message,
                };
                self.bus.publish(rejected);
            }
        }
    }

    fn on_cancellation(&mut self, request: OrderCancellationRequest) {
        if self.open_orders.shift_remove(&request.system_order_id).is_some() {
            let accepted = CancellationAccepted {
                ts_event_ns: request.ts_event_ns,
                ts_created_ns: now_ns(),
                ts_broker_ns: request.ts_event_ns,
                associated_order_id: request.system_order_id,
                broker_order_id: None,
            };
            self.bus.publish(accepted);
        } else {
            let rejected = CancellationRejected {
                ts_event_ns: request.ts_event_ns,
                ts_created_ns: now_ns(),
                ts_broker_ns: request.ts_event_ns,
                associated_order_id: request.system_order_id,
                rejection_reason: CancellationRejectionReason::Unknown,
                rejection_message: "no open order with this id".to_string(),
            };
            self.bus.publish(rejected);
        }
    }

    fn on_modification(&mut self, request: OrderModificationRequest) {
        let Some(order) = self.open_orders.get_mut(&request.system_order_id) else {
            let rejected = ModificationRejected {
                ts_event_ns: request.ts_event_ns,
                ts_created_ns: now_ns(),
                ts_broker_ns: request.ts_event_ns,
                associated_order_id: request.system_order_id,
                rejection_reason: ModificationRejectionReason::Unknown,
                rejection_message: "no open order with this id".to_string(),
            };
            self.bus.publish(rejected);
            return;
        };

        match validate_modification(request.quantity, request.limit_price, request.stop_price) {
            Ok(()) => {
                if let Some(quantity) = request.quantity {
                    order.quantity = quantity;
                }
                if let Some(limit_price) = request.limit_price {
                    order.limit_price = Some(limit_price);
                }
                if let Some(stop_price) = request.stop_price {
                    order.stop_price = Some(stop_price);
                }
                let accepted = ModificationAccepted {
                    ts_event_ns: request.ts_event_ns,
                    ts_created_ns: now_ns(),
                    ts_broker_ns: request.ts_event_ns,
                    associated_order_id: request.system_order_id,
                    broker_order_id: None,
                };
                self.bus.publish(accepted);
            }
            Err(message) => {
                let rejected = ModificationRejected {
                    ts_event_ns: request.ts_event_ns,
                    ts_created_ns: now_ns(),
                    ts_broker_ns: request.ts_event_ns,
                    associated_order_id: request.system_order_id,
                    rejection_reason: ModificationRejectionReason::Unknown,
                    rejection_message: message,
                };
                self.bus.publish(rejected);
            }
        }
    }
}

impl Subscriber for SimulatedBroker {
    fn name(&self) -> &str {
        "simulated-broker"
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::BarReceived(bar) => self.on_bar(&bar),
            Event::OrderSubmissionRequest(request) => self.on_submission(request),
            Event::OrderCancellationRequest(request) => self.on_cancellation(request),
            Event::OrderModificationRequest(request) => self.on_modification(request),
            other => {
                tracing::warn!(kind = ?other.kind(), "simulated broker received an unhandled event kind");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::ids::SystemOrderId;
    use tidemark_core::model::{BarPeriod, OrderType, TradeSide};

    struct Harness {
        broker: SimulatedBroker,
        fills: std::sync::Arc<parking_lot::Mutex<Vec<FillEvent>>>,
    }

    struct RecordingSink {
        fills: std::sync::Arc<parking_lot::Mutex<Vec<FillEvent>>>,
        accepted: std::sync::Arc<parking_lot::Mutex<Vec<OrderAccepted>>>,
        rejected: std::sync::Arc<parking_lot::Mutex<Vec<OrderRejected>>>,
        cancel_accepted: std::sync::Arc<parking_lot::Mutex<Vec<CancellationAccepted>>>,
        cancel_rejected: std::sync::Arc<parking_lot::Mutex<Vec<CancellationRejected>>>,
        modify_accepted: std::sync::Arc<parking_lot::Mutex<Vec<ModificationAccepted>>>,
        modify_rejected: std::sync::Arc<parking_lot::Mutex<Vec<ModificationRejected>>>,
    }

    impl tidemark_core::bus::EventSink for RecordingSink {
        fn deliver(&self, event: Event) {
            match event {
                Event::FillEvent(fill) => self.fills.lock().push(fill),
                Event::OrderAccepted(accepted) => self.accepted.lock().push(accepted),
                Event::OrderRejected(rejected) => self.rejected.lock().push(rejected),
                Event::CancellationAccepted(accepted) => self.cancel_accepted.lock().push(accepted),
                Event::CancellationRejected(rejected) => self.cancel_rejected.lock().push(rejected),
                Event::ModificationAccepted(accepted) => self.modify_accepted.lock().push(accepted),
                Event::ModificationRejected(rejected) => self.modify_rejected.lock().push(rejected),
                _ => {}
            }
        }

        fn wait_until_idle(&self) {}

        fn name(&self) -> &str {
            "recording-sink"
        }
    }

    fn submission(order_type: OrderType, side: TradeSide, limit: Option<f64>, stop: Option<f64>) -> OrderSubmissionRequest {
        OrderSubmissionRequest {
            ts_event_ns: 0,
            ts_created_ns: 0,
            system_order_id: SystemOrderId::new(),
            symbol: "AAPL".into(),
            order_type,
            side,
            quantity: 10.0,
            limit_price: limit,
            stop_price: stop,
            action: None,
            signal: None,
        }
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> BarReceived {
        BarReceived {
            ts_event_ns: 1,
            ts_created_ns: 1,
            symbol: "AAPL".into(),
            bar_period: BarPeriod::Minute,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    fn harness() -> (Harness, std::sync::Arc<RecordingSink>) {
        let bus = EventBus::new();
        let sink = std::sync::Arc::new(RecordingSink {
            fills: Default::default(),
            accepted: Default::default(),
            rejected: Default::default(),
            cancel_accepted: Default::default(),
            cancel_rejected: Default::default(),
            modify_accepted: Default::default(),
            modify_rejected: Default::default(),
        });
        bus.subscribe(
            sink.clone(),
            &[
                EventKind::FillEvent,
                EventKind::OrderAccepted,
                EventKind::OrderRejected,
                EventKind::CancellationAccepted,
                EventKind::CancellationRejected,
                EventKind::ModificationAccepted,
                EventKind::ModificationRejected,
            ],
        );
        let broker = SimulatedBroker::new(bus);
        (Harness { broker, fills: sink.fills.clone() }, sink)
    }

    #[test]
    fn valid_market_order_is_accepted_and_opened() {
        let (mut harness, sink) = harness();
        harness.broker.on_event(submission(OrderType::Market, TradeSide::Buy, None, None).into());
        assert_eq!(harness.broker.open_order_count(), 1);
        assert_eq!(sink.accepted.lock().len(), 1);
    }

    #[test]
    fn limit_order_missing_limit_price_is_rejected() {
        let (mut harness, sink) = harness();
        harness.broker.on_event(submission(OrderType::Limit, TradeSide::Buy, None, None).into());
        assert_eq!(harness.broker.open_order_count(), 0);
        assert_eq!(sink.rejected.lock().len(), 1);
    }

    #[test]
    fn market_order_fills_on_next_bar_at_open_and_closes_the_order() {
        let (mut harness, _sink) = harness();
        harness.broker.on_event(submission(OrderType::Market, TradeSide::Buy, None, None).into());
        harness.broker.on_event(Event::BarReceived(bar(100.0, 105.0, 95.0, 102.0)));
        assert_eq!(harness.broker.open_order_count(), 0);
        let fills = harness.fills.lock();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].fill_price, 100.0);
    }

    #[test]
    fn unfilled_limit_order_stays_open_across_bars() {
        let (mut harness, _sink) = harness();
        harness.broker.on_event(submission(OrderType::Limit, TradeSide::Buy, Some(50.0), None).into());
        harness.broker.on_event(Event::BarReceived(bar(100.0, 105.0, 95.0, 102.0)));
        assert_eq!(harness.broker.open_order_count(), 1);
        assert!(harness.fills.lock().is_empty());
    }

    #[test]
    fn cancelling_an_open_order_removes_it() {
        let (mut harness, sink) = harness();
        let request = submission(OrderType::Limit, TradeSide::Buy, Some(50.0), None);
        let order_id = request.system_order_id;
        harness.broker.on_event(request.into());
        harness.broker.on_event(
            OrderCancellationRequest { ts_event_ns: 0, ts_created_ns: 0, system_order_id: order_id, symbol: "AAPL".into() }
                .into(),
        );
        assert_eq!(harness.broker.open_order_count(), 0);
        assert_eq!(sink.cancel_accepted.lock().len(), 1);
    }

    #[test]
    fn cancelling_an_unknown_order_is_rejected() {
        let (mut harness, sink) = harness();
        harness.broker.on_event(
            OrderCancellationRequest {
                ts_event_ns: 0,
                ts_created_ns: 0,
                system_order_id: SystemOrderId::new(),
                symbol: "AAPL".into(),
            }
            .into(),
        );
        assert_eq!(sink.cancel_rejected.lock().len(), 1);
    }

    #[test]
    fn modifying_an_open_order_updates_it_in_place() {
        let (mut harness, sink) = harness();
        let request = submission(OrderType::Limit, TradeSide::Buy, Some(50.0), None);
        let order_id = request.system_order_id;
        harness.broker.on_event(request.into());
        harness.broker.on_event(
            OrderModificationRequest {
                ts_event_ns: 0,
                ts_created_ns: 0,
                system_order_id: order_id,
                symbol: "AAPL".into(),
                quantity: Some(20.0),
                limit_price: Some(60.0),
                stop_price: None,
            }
            .into(),
        );
        assert_eq!(sink.modify_accepted.lock().len(), 1);
        assert_eq!(harness.broker.open_orders[&order_id].quantity, 20.0);
        assert_eq!(harness.broker.open_orders[&order_id].limit_price, Some(60.0));
    }

    #[test]
    fn modifying_an_unknown_order_is_rejected() {
        let (mut harness, sink) = harness();
        harness.broker.on_event(
            OrderModificationRequest {
                ts_event_ns: 0,
                ts_created_ns: 0,
                system_order_id: SystemOrderId::new(),
                symbol: "AAPL".into(),
                quantity: Some(1.0),
                limit_price: None,
                stop_price: None,
            }
            .into(),
        );
        assert_eq!(sink.modify_rejected.lock().len(), 1);
    }

    #[test]
    fn commission_is_the_greater_of_per_unit_and_minimum() {
        let bus = EventBus::new();
        let sink = std::sync::Arc::new(RecordingSink {
            fills: Default::default(),
            accepted: Default::default(),
            rejected: Default::default(),
            cancel_accepted: Default::default(),
            cancel_rejected: Default::default(),
            modify_accepted: Default::default(),
            modify_rejected: Default::default(),
        });
        bus.subscribe(sink.clone(), &[EventKind::FillEvent]);
        let mut broker = SimulatedBroker::with_commission(bus, 0.01, 5.0);
        broker.on_event(submission(OrderType::Market, TradeSide::Buy, None, None).into());
        broker.on_event(Event::BarReceived(bar(100.0, 105.0, 95.0, 102.0)));
        assert_eq!(sink.fills.lock()[0].commission, 5.0);
    }
}
