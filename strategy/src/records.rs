//! Strategy-local bookkeeping records for submitted orders and received
//! fills, independent of the broker's own order/fill state.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tidemark_core::ids::{FillId, SystemOrderId};
use tidemark_core::model::{OrderType, TradeSide};

/// A strategy's record of an order it has submitted, tracked from
/// submission through fill or cancellation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderRecord {
    pub order_id: SystemOrderId,
    pub symbol: SmolStr,
    pub order_type: OrderType,
    pub side: TradeSide,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub signal: Option<SmolStr>,
    pub filled_quantity: f64,
}

impl OrderRecord {
    pub fn new(
        order_id: SystemOrderId,
        symbol: SmolStr,
        order_type: OrderType,
        side: TradeSide,
        quantity: f64,
        limit_price: Option<f64>,
        stop_price: Option<f64>,
        signal: Option<SmolStr>,
    ) -> Self {
        Self {
            order_id,
            symbol,
            order_type,
            side,
            quantity,
            limit_price,
            stop_price,
            signal,
            filled_quantity: 0.0,
        }
    }
}

/// A strategy's record of a fill it has received.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FillRecord {
    pub fill_id: FillId,
    pub order_id: SystemOrderId,
    pub symbol: SmolStr,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub ts_event_ns: i64,
}
