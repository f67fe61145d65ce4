//! # Logging configuration
//!
//! Standardized `tracing` setup for the backtesting core: a human-readable
//! subscriber for local runs, and a JSON subscriber for piping into log
//! aggregators. Level is controlled via `RUST_LOG`, defaulting to `INFO`.
//!
//! ```rust,ignore
//! use tidemark_core::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("backtest starting");
//! }
//! ```
//!
//! ```bash
//! # module-scoped levels
//! export RUST_LOG=tidemark_core=debug,tidemark_execution=info
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialise human-readable logging to stderr.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// Initialise JSON logging to stderr, one event per line.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
