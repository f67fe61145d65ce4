#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
//! # Recorder — the batched append-only run log
//!
//! [`recorder::RunRecorder`] is a [`tidemark_core::subscriber::Subscriber`]
//! that listens to every event kind the bus carries and appends each one
//! to a per-table buffer. Buffers flush to SQLite once they reach
//! [`recorder::BATCH_SIZE`] or when the subscriber shuts down, so a run
//! with a high event rate pays one transaction per thousand rows rather
//! than one per row. A `runs` table row tracks this invocation's
//! lifecycle from `running` to `completed`/`failed`, updated directly by
//! the orchestrator rather than through the bus.

/// Error type for this crate.
pub mod error;

/// `RunRecorder`, the subscriber that owns the runs database.
pub mod recorder;

pub use error::RecorderError;
pub use recorder::RunRecorder;
