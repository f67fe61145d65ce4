#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
//! # Strategy — the `Strategy` trait and its runtime
//!
//! A strategy implements [`strategy::Strategy`]: declare the symbols and
//! bar period it trades, optionally register indicators in `setup`, and
//! react to bars in `on_bar` through the [`context::StrategyContext`] it
//! is handed. [`runtime::StrategyRuntime`] is the subscriber that wraps a
//! strategy, demultiplexes bars, fans out to its indicators, composes
//! `BarProcessed` events, and maintains the position/average-price books
//! and order buckets that back `ctx.position()`/`ctx.avg_price()`.

/// Constructor-time strategy configuration: symbols, bar period, params.
pub mod config;

/// Declarative parameter specifications for configurable strategies.
pub mod param;

/// Strategy-local order/fill bookkeeping records.
pub mod records;

/// The `StrategyContext` handle and the state it is backed by.
pub mod context;

/// The `Strategy` trait strategy authors implement.
pub mod strategy;

/// `StrategyRuntime`, the subscriber wrapping a `Strategy`.
pub mod runtime;

pub use config::StrategyConfig;
pub use context::{OhlcvHandles, StrategyContext};
pub use strategy::Strategy;
