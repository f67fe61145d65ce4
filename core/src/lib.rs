#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]
//! # Core — event bus, subscriber runtime, and shared event taxonomy
//!
//! This crate is the backbone of the Tidemark backtesting core: a
//! type-indexed publish/subscribe [`bus::EventBus`], a per-subscriber
//! worker-thread runtime with an idle barrier ([`subscriber`]), the
//! immutable [`events`] taxonomy every other crate builds requests and
//! responses from, and the shared identifiers, enums, and error types
//! used across the whole workspace.
//!
//! Nothing in this crate talks to a broker, a datafeed, or a database —
//! it only defines the wire format and the delivery mechanism. See
//! `tidemark-execution`, `tidemark-data`, `tidemark-strategy`, and
//! `tidemark-recorder` for the components that actually produce and
//! consume these events.

/// Type-indexed publish/subscribe dispatch.
pub mod bus;

/// Wall-clock `now_ns()`, used to stamp `ts_created_ns` on every event.
pub mod clock;

/// Central error type aggregating every fallible operation in the core.
pub mod error;

/// Immutable event taxonomy: market data, order requests, broker
/// responses, fills, and expirations.
pub mod events;

/// Opaque identifiers: [`ids::SystemOrderId`], [`ids::BrokerOrderId`],
/// [`ids::FillId`], [`ids::RunId`].
pub mod ids;

/// Structured logging initialisers built on `tracing`.
pub mod logging;

/// Shared closed-set enumerations (`BarPeriod`, `OrderType`, `TradeSide`,
/// `ActionType`, rejection reasons).
pub mod model;

/// Graceful shutdown traits shared by every long-lived component.
pub mod shutdown;

/// Worker-thread subscriber runtime with FIFO inbox and idle barrier.
pub mod subscriber;
