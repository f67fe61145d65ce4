#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
//! # Execution — the simulated broker
//!
//! [`broker::SimulatedBroker`] is a [`tidemark_core::subscriber::Subscriber`]
//! that owns the open-order book for a backtest: it validates submissions,
//! runs the bar-driven matching table against every open order on each
//! `BarReceived`, and answers cancellations and modifications. It never
//! talks to a network or a real exchange — fills are a deterministic
//! function of an order's parameters and the bar that matched it.

/// Order validation and the per-type fill-matching rules.
pub mod order;

/// `SimulatedBroker`, the subscriber wrapping the order book.
pub mod broker;

pub use broker::SimulatedBroker;
