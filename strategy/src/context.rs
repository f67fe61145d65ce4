//! Strategy-facing handle for indicator registration, position/fill
//! introspection, and order submission.

use crate::records::OrderRecord;
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;
use tidemark_core::bus::EventBus;
use tidemark_core::clock::now_ns;
use tidemark_core::events::{OrderCancellationRequest, OrderModificationRequest, OrderSubmissionRequest};
use tidemark_core::ids::SystemOrderId;
use tidemark_core::model::{ActionType, OrderType, TradeSide};
use tidemark_indicators::Indicator;

/// The five OHLCV passthrough indicators every strategy gets for free,
/// registered before `Strategy::setup` runs so `setup` and `on_bar` can
/// read `ctx.bar().close.history(symbol)` without declaring them.
#[derive(Clone)]
pub struct OhlcvHandles {
    pub open: Arc<dyn Indicator>,
    pub high: Arc<dyn Indicator>,
    pub low: Arc<dyn Indicator>,
    pub close: Arc<dyn Indicator>,
    pub volume: Arc<dyn Indicator>,
}

impl std::fmt::Debug for OhlcvHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OhlcvHandles").finish_non_exhaustive()
    }
}

/// Mutable state the strategy runtime owns on a strategy's behalf:
/// registered indicators, position/average-price books, fill history,
/// and the four order-bucket maps tracking submission through
/// acknowledgement.
pub(crate) struct StrategyState {
    pub(crate) current_symbol: SmolStr,
    pub(crate) current_ts_ns: i64,
    pub(crate) ohlcv: OhlcvHandles,
    pub(crate) indicators: Vec<Arc<dyn Indicator>>,
    pub(crate) fills: IndexMap<SmolStr, Vec<crate::records::FillRecord>>,
    pub(crate) positions: IndexMap<SmolStr, f64>,
    pub(crate) avg_prices: IndexMap<SmolStr, f64>,
    pub(crate) pending_orders: IndexMap<SystemOrderId, OrderRecord>,
    pub(crate) submitted_orders: IndexMap<SystemOrderId, OrderRecord>,
    pub(crate) submitted_modifications: IndexMap<SystemOrderId, OrderRecord>,
    pub(crate) submitted_cancellations: IndexMap<SystemOrderId, OrderRecord>,
}

impl StrategyState {
    pub(crate) fn new(ohlcv: OhlcvHandles) -> Self {
        let indicators: Vec<Arc<dyn Indicator>> =
            vec![ohlcv.open.clone(), ohlcv.high.clone(), ohlcv.low.clone(), ohlcv.close.clone(), ohlcv.volume.clone()];
        Self {
            current_symbol: SmolStr::default(),
            current_ts_ns: 0,
            ohlcv,
            indicators,
            fills: IndexMap::new(),
            positions: IndexMap::new(),
            avg_prices: IndexMap::new(),
            pending_orders: IndexMap::new(),
            submitted_orders: IndexMap::new(),
            submitted_modifications: IndexMap::new(),
            submitted_cancellations: IndexMap::new(),
        }
    }
}

/// Handle passed to [`crate::strategy::Strategy::setup`] and
/// [`crate::strategy::Strategy::on_bar`].
///
/// Borrowed for the duration of one call; a strategy cannot stash it.
pub struct StrategyContext<'a> {
    pub(crate) state: &'a mut StrategyState,
    pub(crate) bus: &'a EventBus,
}

impl<'a> StrategyContext<'a> {
    /// Register `indicator` so the runtime updates it on every bar for a
    /// subscribed symbol. Returns the same handle back for convenience,
    /// matching the Python original's `add_indicator`.
    pub fn add_indicator(&mut self, indicator: Arc<dyn Indicator>) -> Arc<dyn Indicator> {
        self.state.indicators.push(indicator.clone());
        indicator
    }

    /// The five built-in OHLCV passthrough indicators.
    pub fn bar(&self) -> &OhlcvHandles {
        &self.state.ohlcv
    }

    /// Symbol of the bar currently being processed.
    pub fn current_symbol(&self) -> &str {
        &self.state.current_symbol
    }

    /// Event timestamp (nanoseconds) of the bar currently being processed.
    pub fn current_ts_ns(&self) -> i64 {
        self.state.current_ts_ns
    }

    /// Current position size for the active symbol. Positive is long,
    /// negative is short, zero is flat.
    pub fn position(&self) -> f64 {
        self.state.positions.get(self.current_symbol()).copied().unwrap_or(0.0)
    }

    /// Average entry price of the current position on the active symbol.
    /// Zero when flat.
    pub fn avg_price(&self) -> f64 {
        self.state.avg_prices.get(self.current_symbol()).copied().unwrap_or(0.0)
    }

    /// Fills received so far for the active symbol, oldest first.
    pub fn fills(&self) -> &[crate::records::FillRecord] {
        self.state
            .fills
            .get(self.current_symbol())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Submit a new order for the active symbol. Returns the
    /// system-assigned order id immediately; the order only becomes
    /// tracked in [`StrategyContext::position`] once a fill arrives.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_order(
        &mut self,
        order_type: OrderType,
        side: TradeSide,
        quantity: f64,
        limit_price: Option<f64>,
        stop_price: Option<f64>,
        action: Option<ActionType>,
        signal: Option<SmolStr>,
    ) -> SystemOrderId {
        let order_id = SystemOrderId::new();
        let symbol = self.state.current_symbol.clone();
        let ts = self.state.current_ts_ns;

        let request = OrderSubmissionRequest {
            ts_event_ns: ts,
            ts_created_ns: now_ns(),
            system_order_id: order_id,
            symbol: symbol.clone(),
            order_type,
            side,
            quantity,
            limit_price,
            stop_price,
            action,
            signal: signal.clone(),
        };

        let record = OrderRecord::new(order_id, symbol, order_type, side, quantity, limit_price, stop_price, signal);

        self.state.submitted_orders.insert(order_id, record);
        self.bus.publish(request);
        order_id
    }

    /// Submit a modification for a currently pending order. Returns
    /// `false` without publishing anything if `order_id` is not pending.
    pub fn submit_modification(
        &mut self,
        order_id: SystemOrderId,
        quantity: Option<f64>,
        limit_price: Option<f64>,
        stop_price: Option<f64>,
    ) -> bool {
        let Some(original) = self.state.pending_orders.get(&order_id).cloned() else {
            return false;
        };

        let request = OrderModificationRequest {
            ts_event_ns: self.state.current_ts_ns,
            ts_created_ns: now_ns(),
            system_order_id: order_id,
            symbol: original.symbol.clone(),
            quantity,
            limit_price,
            stop_price,
        };

        let modified = OrderRecord {
            quantity: quantity.unwrap_or(original.quantity),
            limit_price: limit_price.or(original.limit_price),
            stop_price: stop_price.or(original.stop_price),
            ..original
        };

        self.state.submitted_modifications.insert(order_id, modified);
        self.bus.publish(request);
        true
    }

    /// Submit a cancellation for a currently pending order. Returns
    /// `false` without publishing anything if `order_id` is not pending.
    pub fn submit_cancellation(&mut self, order_id: SystemOrderId) -> bool {
        let Some(original) = self.state.pending_orders.get(&order_id).cloned() else {
            return false;
        };

        let request = OrderCancellationRequest {
            ts_event_ns: self.state.current_ts_ns,
            ts_created_ns: now_ns(),
            system_order_id: order_id,
            symbol: original.symbol.clone(),
        };

        self.state.submitted_cancellations.insert(order_id, original);
        self.bus.publish(request);
        true
    }
}
