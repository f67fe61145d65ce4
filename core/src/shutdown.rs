//! # Shutdown management
//!
//! Every long-lived component in this workspace (subscriber worker
//! threads, the datafeed producer thread, the recorder) shuts down
//! synchronously and idempotently: calling `shutdown()` twice must not
//! panic or double-join a thread. There is no async variant here — unlike
//! the teacher's engine, nothing in this core ever awaits.

/// Components that can be shut down in place, returning a result describing
/// how the shutdown went.
///
/// Implementations must be idempotent: a second call to `shutdown` after
/// the component is already stopped returns the same success value rather
/// than erroring or panicking.
pub trait Shutdown {
    /// The result type returned by the shutdown operation.
    type Result;

    /// Stop the component, releasing any background thread or resource it
    /// owns, and block until that release has completed.
    fn shutdown(&mut self) -> Self::Result;
}
