//! The `Strategy` trait — the interface strategy authors implement.

use crate::context::StrategyContext;
use crate::param::ParamSpec;
use smol_str::SmolStr;
use tidemark_core::events::BarReceived;
use tidemark_core::model::BarPeriod;

/// Trading logic for one or more symbols on a single bar period.
///
/// A strategy never touches the event bus directly; it reads market
/// state and submits orders exclusively through the [`StrategyContext`]
/// the runtime hands it. This keeps strategy code free of threading and
/// subscription concerns — those are [`crate::runtime::StrategyRuntime`]'s job.
pub trait Strategy: Send {
    /// Human-readable name, used in the run id and recorder output.
    fn name(&self) -> &str;

    /// Symbols this strategy trades. Bars for any other symbol are
    /// filtered out before `on_bar` is called.
    fn symbols(&self) -> &[SmolStr];

    /// The single bar period this strategy reacts to. Bars of any other
    /// period are filtered out before `on_bar` is called.
    fn bar_period(&self) -> BarPeriod;

    /// Declared tunable parameters, keyed by name. Used by callers that
    /// want to enumerate or validate overrides before construction; the
    /// strategy itself is expected to already hold its resolved values by
    /// the time it's constructed.
    fn parameters(&self) -> &indexmap::IndexMap<String, ParamSpec> {
        static EMPTY: std::sync::OnceLock<indexmap::IndexMap<String, ParamSpec>> = std::sync::OnceLock::new();
        EMPTY.get_or_init(indexmap::IndexMap::new)
    }

    /// Hook for registering indicators, called once right after the
    /// built-in OHLCV indicators are registered. Override to call
    /// `ctx.add_indicator(...)`; the default does nothing.
    fn setup(&mut self, ctx: &mut StrategyContext<'_>) {
        let _ = ctx;
    }

    /// Called once per bar, for a subscribed symbol and bar period, after
    /// every registered indicator has already been updated with this bar.
    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>, event: &BarReceived);
}

/// Lets an orchestrator hold a heterogeneous collection of strategies as
/// `StrategyRuntime<Box<dyn Strategy>>` instead of one generic runtime
/// per concrete strategy type.
impl Strategy for Box<dyn Strategy> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn symbols(&self) -> &[SmolStr] {
        (**self).symbols()
    }

    fn bar_period(&self) -> BarPeriod {
        (**self).bar_period()
    }

    fn parameters(&self) -> &indexmap::IndexMap<String, ParamSpec> {
        (**self).parameters()
    }

    fn setup(&mut self, ctx: &mut StrategyContext<'_>) {
        (**self).setup(ctx)
    }

    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>, event: &BarReceived) {
        (**self).on_bar(ctx, event)
    }
}
