//! Golden/death-cross strategy: long when the fast average crosses above
//! the slow one while flat or short, short on the mirror crossing.

use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;
use tidemark_core::events::BarReceived;
use tidemark_core::model::{BarPeriod, OrderType, TradeSide};
use tidemark_indicators::bar::BarField;
use tidemark_indicators::moving_average::SimpleMovingAverage;
use tidemark_indicators::Indicator;
use tidemark_strategy::param::{ParamSpec, ParamValue};
use tidemark_strategy::{Strategy, StrategyConfig, StrategyContext};

/// History depth kept for each moving average's own buffer. `-2` is the
/// deepest index a crossing comparison needs, so this only has to stay
/// ahead of the slow period by a couple of bars.
const INDICATOR_HISTORY: usize = 256;

/// Trades one or more symbols on a single bar period using two
/// [`SimpleMovingAverage`] indicators over the close price.
#[derive(Debug)]
pub struct SmaCrossover {
    config: StrategyConfig,
    fast_period: usize,
    slow_period: usize,
    quantity: f64,
    fast_sma: Option<Arc<dyn Indicator>>,
    slow_sma: Option<Arc<dyn Indicator>>,
}

impl SmaCrossover {
    /// A crossover strategy with the defaults: 20/100-period SMAs and a
    /// quantity of one unit per signal.
    pub fn new(symbols: Vec<SmolStr>, bar_period: BarPeriod) -> Self {
        let mut strategy = Self {
            config: StrategyConfig::new(symbols, bar_period),
            fast_period: 20,
            slow_period: 100,
            quantity: 1.0,
            fast_sma: None,
            slow_sma: None,
        };
        strategy.refresh_params();
        strategy
    }

    pub fn with_periods(mut self, fast_period: usize, slow_period: usize) -> Self {
        self.fast_period = fast_period;
        self.slow_period = slow_period;
        self.refresh_params();
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self.refresh_params();
        self
    }

    fn refresh_params(&mut self) {
        let parameters = IndexMap::from([
            (
                "fast_period".to_string(),
                ParamSpec::new(ParamValue::Int(self.fast_period as i64))
                    .with_bounds(ParamValue::Int(1), ParamValue::Int(self.slow_period as i64 - 1)),
            ),
            (
                "slow_period".to_string(),
                ParamSpec::new(ParamValue::Int(self.slow_period as i64))
                    .with_bounds(ParamValue::Int(self.fast_period as i64 + 1), ParamValue::Int(i64::MAX)),
            ),
            (
                "quantity".to_string(),
                ParamSpec::new(ParamValue::Float(self.quantity))
                    .with_bounds(ParamValue::Float(0.0), ParamValue::Float(f64::MAX)),
            ),
        ]);
        self.config = self.config.clone().with_parameters(parameters);
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        "SMACrossover"
    }

    fn symbols(&self) -> &[SmolStr] {
        &self.config.symbols
    }

    fn bar_period(&self) -> BarPeriod {
        self.config.bar_period
    }

    fn parameters(&self) -> &IndexMap<String, ParamSpec> {
        &self.config.parameters
    }

    fn setup(&mut self, ctx: &mut StrategyContext<'_>) {
        self.fast_sma = Some(ctx.add_indicator(Arc::new(SimpleMovingAverage::new(
            self.fast_period,
            BarField::Close,
            INDICATOR_HISTORY,
        ))));
        self.slow_sma = Some(ctx.add_indicator(Arc::new(SimpleMovingAverage::new(
            self.slow_period,
            BarField::Close,
            INDICATOR_HISTORY,
        ))));
    }

    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>, _event: &BarReceived) {
        let symbol = ctx.current_symbol().to_string();
        let fast_sma = self.fast_sma.as_ref().expect("setup registers fast_sma before on_bar runs");
        let slow_sma = self.slow_sma.as_ref().expect("setup registers slow_sma before on_bar runs");

        let fast_prev = fast_sma.get(&symbol, -2);
        let slow_prev = slow_sma.get(&symbol, -2);
        let fast_latest = fast_sma.latest(&symbol);
        let slow_latest = slow_sma.latest(&symbol);

        // Comparisons against NaN (warm-up, unseen symbol) are always
        // false, so no explicit warm-up guard is needed here.
        if fast_prev <= slow_prev && fast_latest > slow_latest && ctx.position() <= 0.0 {
            ctx.submit_order(OrderType::Market, TradeSide::Buy, self.quantity, None, None, None, None);
        }

        if fast_prev >= slow_prev && fast_latest < slow_latest && ctx.position() >= 0.0 {
            ctx.submit_order(OrderType::Market, TradeSide::Sell, self.quantity, None, None, None, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tidemark_core::bus::{EventBus, EventSink};
    use tidemark_core::events::{Event, EventKind, OrderSubmissionRequest};
    use tidemark_core::subscriber::Subscriber;
    use tidemark_strategy::runtime::StrategyRuntime;

    fn ohlcv_handles() -> tidemark_strategy::OhlcvHandles {
        use tidemark_indicators::bar::{Close, High, Low, Open, Volume};
        tidemark_strategy::OhlcvHandles {
            open: Arc::new(Open::default()),
            high: Arc::new(High::default()),
            low: Arc::new(Low::default()),
            close: Arc::new(Close::default()),
            volume: Arc::new(Volume::default()),
        }
    }

    fn bar(symbol: &str, ts: i64, close: f64) -> BarReceived {
        BarReceived {
            ts_event_ns: ts,
            ts_created_ns: ts,
            symbol: symbol.into(),
            bar_period: BarPeriod::Minute,
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(1),
        }
    }

    struct SubmissionSink {
        submissions: Mutex<Vec<OrderSubmissionRequest>>,
    }

    impl EventSink for SubmissionSink {
        fn deliver(&self, event: Event) {
            if let Event::OrderSubmissionRequest(request) = event {
                self.submissions.lock().push(request);
            }
        }

        fn wait_until_idle(&self) {}

        fn name(&self) -> &str {
            "submission-sink"
        }
    }

    #[test]
    fn with_periods_updates_the_declared_parameter_defaults() {
        let strategy = SmaCrossover::new(vec!["AAPL".into()], BarPeriod::Minute).with_periods(5, 50);
        let params = strategy.parameters();
        assert_eq!(params.get("fast_period").unwrap().default, ParamValue::Int(5));
        assert_eq!(params.get("slow_period").unwrap().default, ParamValue::Int(50));
    }

    #[test]
    fn a_crossing_series_eventually_submits_an_order() {
        let bus = EventBus::new();
        let sink = Arc::new(SubmissionSink { submissions: Mutex::new(Vec::new()) });
        bus.subscribe(sink.clone(), &[EventKind::OrderSubmissionRequest]);

        let strategy = SmaCrossover::new(vec!["AAPL".into()], BarPeriod::Minute).with_periods(2, 3);
        let mut runtime = StrategyRuntime::new(bus, strategy, ohlcv_handles());

        // A falling-then-rising series crosses the fast SMA and the slow
        // SMA against each other at least once after both windows fill.
        let closes = [10.0, 10.0, 10.0, 5.0, 5.0, 20.0, 20.0];
        for (i, close) in closes.iter().enumerate() {
            runtime.on_event(Event::BarReceived(bar("AAPL", i as i64, *close)));
        }

        assert!(!sink.submissions.lock().is_empty());
    }

    #[test]
    fn bar_for_an_unsubscribed_symbol_never_reaches_on_bar() {
        let bus = EventBus::new();
        let sink = Arc::new(SubmissionSink { submissions: Mutex::new(Vec::new()) });
        bus.subscribe(sink.clone(), &[EventKind::OrderSubmissionRequest]);

        let strategy = SmaCrossover::new(vec!["AAPL".into()], BarPeriod::Minute).with_periods(2, 3);
        let mut runtime = StrategyRuntime::new(bus, strategy, ohlcv_handles());

        for i in 0..5 {
            runtime.on_event(Event::BarReceived(bar("MSFT", i, 10.0)));
        }

        assert!(sink.submissions.lock().is_empty());
    }
}
