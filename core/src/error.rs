//! # Core error types
//!
//! Aggregates the fallible operations exposed by this crate (bus
//! subscription bookkeeping, subscriber shutdown) behind one enum so
//! downstream crates can convert into it with `?` rather than matching
//! on several narrow error types.

use thiserror::Error;

/// Central error type for `tidemark-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A publish targeted an [`crate::events::EventKind`] with no registered
    /// subscribers. Not necessarily a bug — callers that care can check
    /// `EventBus::subscriber_count` before publishing — but returned as an
    /// error from `EventBus::publish_checked` for callers that do care.
    #[error("no subscribers registered for {0:?}")]
    NoSubscribers(crate::events::EventKind),

    /// A subscriber's inbox was full and the bus is configured to reject
    /// rather than block on a full queue.
    #[error("subscriber {subscriber} inbox full (capacity {capacity})")]
    InboxFull { subscriber: String, capacity: usize },

    /// The receiving end of a subscriber's channel was dropped, meaning its
    /// worker thread has already exited.
    #[error("subscriber {0} worker thread is no longer running")]
    SubscriberGone(String),

    /// A subscriber's worker thread panicked while handling an event.
    #[error("subscriber {subscriber} panicked: {message}")]
    SubscriberPanicked { subscriber: String, message: String },

    /// Joining a subscriber's worker thread during shutdown failed.
    #[error("failed to join worker thread for subscriber {0}")]
    JoinFailed(String),
}
