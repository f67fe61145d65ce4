//! Demo strategies built on the core traits, for tests and the
//! `run-backtest` binary.

/// Golden/death-cross moving-average strategy.
pub mod sma_crossover;

pub use sma_crossover::SmaCrossover;
