#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
//! # Trader — the backtest orchestrator
//!
//! [`orchestrator::Orchestrator`] wires a shared
//! [`tidemark_core::bus::EventBus`] to a [`tidemark_recorder::RunRecorder`],
//! a [`tidemark_execution::SimulatedBroker`], one
//! [`tidemark_strategy::runtime::StrategyRuntime`] per strategy, and a
//! [`tidemark_data::SimulatedDatafeed`], then drives the datafeed to
//! completion and tears every component down in reverse order. It owns
//! no trading logic of its own — [`strategies`] holds a demo strategy
//! built on the core traits, and the `run-backtest` binary shows the
//! whole stack wired together end to end.

/// Error type for a failed or misconfigured run.
pub mod error;

/// The `Orchestrator` that drives one backtest run.
pub mod orchestrator;

/// Demo strategies built on `tidemark-strategy`.
pub mod strategies;

pub use error::OrchestratorError;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
