#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
//! # Data — the secmaster catalog and the simulated datafeed
//!
//! [`catalog::Catalog`] is a read-only SQLite reader over a secmaster
//! database (`publishers`, `instruments`, `symbology`, `ohlcv`).
//! [`datafeed::SimulatedDatafeed`] drives a backtest from it: a
//! background thread queries the subscribed `(symbol, bar_period)` set,
//! groups the result by timestamp, and publishes each timestamp's bars
//! as one batch, calling `EventBus::wait_until_system_idle` between
//! batches so no subscriber ever observes bar *t+1* before every
//! subscriber has finished reacting to bar *t*.

/// Error type for this crate.
pub mod error;

/// Read-only SQLite secmaster reader.
pub mod catalog;

/// Timestamp-batched producer thread.
pub mod datafeed;

pub use catalog::Catalog;
pub use datafeed::SimulatedDatafeed;
pub use error::DataError;
