//! The open-order record and the validation/matching rules the broker
//! applies to it.

use smol_str::SmolStr;
use tidemark_core::events::{BarReceived, OrderSubmissionRequest};
use tidemark_core::ids::SystemOrderId;
use tidemark_core::model::{OrderType, TradeSide};

/// An order the broker has accepted and is still trying to fill.
///
/// `triggered` starts `true` for MARKET and LIMIT orders (they are
/// matchable from the bar they were accepted on) and `false` for STOP and
/// STOP_LIMIT orders, which must first see a bar that crosses their stop
/// price. A plain STOP never lingers in a triggered-but-unfilled state —
/// triggering and filling happen on the same bar — but STOP_LIMIT does:
/// once triggered it behaves as a LIMIT order from that bar onward.
#[derive(Debug, Clone)]
pub(crate) struct OpenOrder {
    pub(crate) order_id: SystemOrderId,
    pub(crate) symbol: SmolStr,
    pub(crate) order_type: OrderType,
    pub(crate) side: TradeSide,
    pub(crate) quantity: f64,
    pub(crate) limit_price: Option<f64>,
    pub(crate) stop_price: Option<f64>,
    pub(crate) triggered: bool,
}

impl OpenOrder {
    pub(crate) fn from_request(request: &OrderSubmissionRequest) -> Self {
        let triggered = matches!(request.order_type, OrderType::Market | OrderType::Limit);
        Self {
            order_id: request.system_order_id,
            symbol: request.symbol.clone(),
            order_type: request.order_type,
            side: request.side,
            quantity: request.quantity,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            triggered,
        }
    }
}

fn require_positive(value: Option<f64>, field: &str) -> Result<(), String> {
    match value {
        Some(v) if v > 0.0 => Ok(()),
        Some(_) => Err(format!("{field} must be positive")),
        None => Err(format!("{field} is required for this order type")),
    }
}

/// Validate a new submission before it is admitted to the open-order book.
pub(crate) fn validate_submission(request: &OrderSubmissionRequest) -> Result<(), String> {
    if request.quantity <= 0.0 {
        return Err("quantity must be positive".to_string());
    }
    match request.order_type {
        OrderType::Market => Ok(()),
        OrderType::Limit => require_positive(request.limit_price, "limit_price"),
        OrderType::Stop => require_positive(request.stop_price, "stop_price"),
        OrderType::StopLimit => {
            require_positive(request.limit_price, "limit_price")?;
            require_positive(request.stop_price, "stop_price")
        }
    }
}

/// Validate a proposed in-place modification. Fields left `None` are
/// unchanged and therefore never fail validation.
pub(crate) fn validate_modification(
    quantity: Option<f64>,
    limit_price: Option<f64>,
    stop_price: Option<f64>,
) -> Result<(), String> {
    if let Some(quantity) = quantity {
        if quantity <= 0.0 {
            return Err("quantity must be positive".to_string());
        }
    }
    if let Some(limit_price) = limit_price {
        if limit_price <= 0.0 {
            return Err("limit_price must be positive".to_string());
        }
    }
    if let Some(stop_price) = stop_price {
        if stop_price <= 0.0 {
            return Err("stop_price must be positive".to_string());
        }
    }
    Ok(())
}

/// Try to fill `order` against `bar`, mutating `order.triggered` if a
/// STOP_LIMIT order crosses its stop price on this bar. Returns the fill
/// price on a match, `None` otherwise.
pub(crate) fn attempt_fill(order: &mut OpenOrder, bar: &BarReceived) -> Option<f64> {
    match order.order_type {
        OrderType::Market => Some(bar.open),
        OrderType::Limit => {
            let limit = order.limit_price.expect("limit order always carries a limit_price");
            match order.side {
                TradeSide::Buy => (bar.low <= limit).then(|| bar.open.min(limit)),
                TradeSide::Sell => (bar.high >= limit).then(|| bar.open.max(limit)),
            }
        }
        OrderType::Stop => {
            let stop = order.stop_price.expect("stop order always carries a stop_price");
            match order.side {
                TradeSide::Buy => (bar.high >= stop).then(|| bar.open.max(stop)),
                TradeSide::Sell => (bar.low <= stop).then(|| bar.open.min(stop)),
            }
        }
        OrderType::StopLimit => {
            let stop = order.stop_price.expect("stop_limit order always carries a stop_price");
            let limit = order.limit_price.expect("stop_limit order always carries a limit_price");
            if !order.triggered {
                let triggers = match order.side {
                    TradeSide::Buy => bar.high >= stop,
                    TradeSide::Sell => bar.low <= stop,
                };
                if !triggers {
                    return None;
                }
                order.triggered = true;
            }
            match order.side {
                TradeSide::Buy => (bar.low <= limit).then(|| bar.open.min(limit)),
                TradeSide::Sell => (bar.high >= limit).then(|| bar.open.max(limit)),
            }
        }
    }
}
