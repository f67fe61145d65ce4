#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
//! # Indicators — the indicator contract and a small built-in library
//!
//! An [`indicator::Indicator`] turns a stream of bars into a per-symbol
//! series of `f64` values. The contract is deliberately thin: `update`
//! appends one value per incoming bar, `get`/`latest` read back what was
//! computed with Python-style indexing (negative counts from the most
//! recent value), and reading an unknown symbol, an out-of-range index,
//! or a value not yet computed during warm-up all return `NaN` rather
//! than an `Option` or an error — callers are expected to test with
//! `is_nan` the same way the strategy runtime does.
//!
//! Built-ins: the five OHLCV passthroughs ([`bar::Open`], [`bar::High`],
//! [`bar::Low`], [`bar::Close`], [`bar::Volume`]), [`moving_average::SimpleMovingAverage`],
//! and [`period_extreme::PeriodExtreme`], a generic rolling min/max over
//! any other indicator's output.

/// Per-symbol bounded history buffer and the [`indicator::Indicator`] trait.
pub mod indicator;

/// OHLCV field selector and the five passthrough indicators.
pub mod bar;

/// Simple moving average over a chosen bar field.
pub mod moving_average;

/// Rolling min/max over another indicator's output.
pub mod period_extreme;

/// Plotting metadata enums forwarded to the recorder, inert to computation.
pub mod plot;

pub use indicator::Indicator;
