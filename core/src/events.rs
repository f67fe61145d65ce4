//! Immutable event taxonomy.
//!
//! Every variant here is constructed once at its publish site, observed
//! read-only by every subscriber that receives it, and (if recording is
//! enabled) persisted by the recorder before being dropped. None of these
//! types carry behavior beyond plain field access — the state machines
//! that interpret them (broker, strategy runtime) live in their own
//! crates.

use crate::ids::{BrokerOrderId, FillId, SystemOrderId};
use crate::model::{
    ActionType, BarPeriod, CancellationRejectionReason, ModificationRejectionReason, OrderRejectionReason,
    OrderType, TradeSide,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A received market bar.
///
/// `ts_event_ns` is the bar's close time; `ts_created_ns` is wall-clock
/// time the event object was instantiated.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BarReceived {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub symbol: SmolStr,
    pub bar_period: BarPeriod,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}

/// A bar after a strategy has updated its indicators and formed its
/// opinion, carrying the latest value of every non-OHLCV indicator.
///
/// `indicators` is ordered (registration order) and keyed by
/// `"{panel_id:02d}_{indicator_name}"`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BarProcessed {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub symbol: SmolStr,
    pub bar_period: BarPeriod,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
    pub indicators: IndexMap<String, f64>,
}

/// A request to open a new order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderSubmissionRequest {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub system_order_id: SystemOrderId,
    pub symbol: SmolStr,
    pub order_type: OrderType,
    pub side: TradeSide,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub action: Option<ActionType>,
    pub signal: Option<SmolStr>,
}

/// A request to cancel a previously accepted order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderCancellationRequest {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub system_order_id: SystemOrderId,
    pub symbol: SmolStr,
}

/// A request to change the quantity, limit, or stop price of a pending order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderModificationRequest {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub system_order_id: SystemOrderId,
    pub symbol: SmolStr,
    pub quantity: Option<f64>,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
}

/// Broker accepted an `OrderSubmissionRequest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderAccepted {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub associated_order_id: SystemOrderId,
    pub broker_order_id: Option<BrokerOrderId>,
}

/// Broker rejected an `OrderSubmissionRequest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderRejected {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub associated_order_id: SystemOrderId,
    pub rejection_reason: OrderRejectionReason,
    pub rejection_message: String,
}

/// Broker accepted an `OrderModificationRequest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModificationAccepted {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub associated_order_id: SystemOrderId,
    pub broker_order_id: Option<BrokerOrderId>,
}

/// Broker rejected an `OrderModificationRequest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModificationRejected {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub associated_order_id: SystemOrderId,
    pub rejection_reason: ModificationRejectionReason,
    pub rejection_message: String,
}

/// Broker accepted an `OrderCancellationRequest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CancellationAccepted {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub associated_order_id: SystemOrderId,
    pub broker_order_id: Option<BrokerOrderId>,
}

/// Broker rejected an `OrderCancellationRequest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CancellationRejected {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub associated_order_id: SystemOrderId,
    pub rejection_reason: CancellationRejectionReason,
    pub rejection_message: String,
}

/// A completed (always full, never partial) trade against an open order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FillEvent {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub fill_id: FillId,
    pub broker_fill_id: Option<String>,
    pub associated_order_id: SystemOrderId,
    pub broker_order_id: Option<BrokerOrderId>,
    pub symbol: SmolStr,
    pub side: TradeSide,
    pub quantity_filled: f64,
    pub fill_price: f64,
    pub commission: f64,
    pub exchange: SmolStr,
}

/// An open order expired without being filled or cancelled.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderExpired {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub associated_order_id: SystemOrderId,
    pub symbol: SmolStr,
    pub broker_order_id: Option<BrokerOrderId>,
}

/// Sealed sum of every event variant the bus can carry.
///
/// The bus keys its subscription map on [`EventKind`] (the tag, not a
/// runtime class object), matching spec.md's Design Note on duck-typed
/// dispatch becoming exact tagged-union dispatch. Subscribers
/// pattern-match on this enum in their `on_event` handler.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Event {
    BarReceived(BarReceived),
    BarProcessed(BarProcessed),
    OrderSubmissionRequest(OrderSubmissionRequest),
    OrderCancellationRequest(OrderCancellationRequest),
    OrderModificationRequest(OrderModificationRequest),
    OrderAccepted(OrderAccepted),
    OrderRejected(OrderRejected),
    ModificationAccepted(ModificationAccepted),
    ModificationRejected(ModificationRejected),
    CancellationAccepted(CancellationAccepted),
    CancellationRejected(CancellationRejected),
    FillEvent(FillEvent),
    OrderExpired(OrderExpired),
}

/// The exact-match dispatch key the bus subscribes components against.
///
/// One variant per [`Event`] variant, with no base/derived relationship —
/// a subscription to a base type does not exist in this taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    BarReceived,
    BarProcessed,
    OrderSubmissionRequest,
    OrderCancellationRequest,
    OrderModificationRequest,
    OrderAccepted,
    OrderRejected,
    ModificationAccepted,
    ModificationRejected,
    CancellationAccepted,
    CancellationRejected,
    FillEvent,
    OrderExpired,
}

impl Event {
    /// The dispatch key used by the bus to find subscribers.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BarReceived(_) => EventKind::BarReceived,
            Event::BarProcessed(_) => EventKind::BarProcessed,
            Event::OrderSubmissionRequest(_) => EventKind::OrderSubmissionRequest,
            Event::OrderCancellationRequest(_) => EventKind::OrderCancellationRequest,
            Event::OrderModificationRequest(_) => EventKind::OrderModificationRequest,
            Event::OrderAccepted(_) => EventKind::OrderAccepted,
            Event::OrderRejected(_) => EventKind::OrderRejected,
            Event::ModificationAccepted(_) => EventKind::ModificationAccepted,
            Event::ModificationRejected(_) => EventKind::ModificationRejected,
            Event::CancellationAccepted(_) => EventKind::CancellationAccepted,
            Event::CancellationRejected(_) => EventKind::CancellationRejected,
            Event::FillEvent(_) => EventKind::FillEvent,
            Event::OrderExpired(_) => EventKind::OrderExpired,
        }
    }
}

macro_rules! impl_from_event {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Event {
                fn from(value: $ty) -> Self {
                    Event::$variant(value)
                }
            }
        )+
    };
}

impl_from_event! {
    BarReceived => BarReceived,
    BarProcessed => BarProcessed,
    OrderSubmissionRequest => OrderSubmissionRequest,
    OrderCancellationRequest => OrderCancellationRequest,
    OrderModificationRequest => OrderModificationRequest,
    OrderAccepted => OrderAccepted,
    OrderRejected => OrderRejected,
    ModificationAccepted => ModificationAccepted,
    ModificationRejected => ModificationRejected,
    CancellationAccepted => CancellationAccepted,
    CancellationRejected => CancellationRejected,
    FillEvent => FillEvent,
    OrderExpired => OrderExpired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_matches_variant() {
        let bar = BarReceived {
            ts_event_ns: 1,
            ts_created_ns: 1,
            symbol: "AAPL".into(),
            bar_period: BarPeriod::Minute,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: None,
        };
        let event: Event = bar.into();
        assert_eq!(event.kind(), EventKind::BarReceived);
    }
}
