//! Constructor-time configuration for a concrete [`crate::strategy::Strategy`].

use crate::param::ParamSpec;
use indexmap::IndexMap;
use smol_str::SmolStr;
use tidemark_core::model::BarPeriod;

/// The symbols, bar period, and declared parameters a strategy is built
/// with.
///
/// Mirrors spec.md's constructor-argument design note: rather than the
/// original's subclass-level class attributes, a Rust strategy builds one
/// of these once at construction time and reports it back through
/// `Strategy::symbols`/`bar_period`/`parameters`.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub symbols: Vec<SmolStr>,
    pub bar_period: BarPeriod,
    pub parameters: IndexMap<String, ParamSpec>,
}

impl StrategyConfig {
    /// A configuration with no declared parameters yet; add them with
    /// [`StrategyConfig::with_parameters`].
    pub fn new(symbols: Vec<SmolStr>, bar_period: BarPeriod) -> Self {
        Self { symbols, bar_period, parameters: IndexMap::new() }
    }

    pub fn with_parameters(mut self, parameters: IndexMap<String, ParamSpec>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamValue;

    #[test]
    fn new_config_has_no_parameters_until_declared() {
        let config = StrategyConfig::new(vec!["AAPL".into()], BarPeriod::Minute);
        assert!(config.parameters.is_empty());
        assert_eq!(config.symbols.len(), 1);
    }

    #[test]
    fn with_parameters_replaces_the_empty_default() {
        let config = StrategyConfig::new(vec!["AAPL".into()], BarPeriod::Minute)
            .with_parameters(IndexMap::from([("quantity".to_string(), ParamSpec::new(ParamValue::Float(1.0)))]));
        assert_eq!(config.parameters.len(), 1);
    }
}
