//! Error type for run registration and buffer-flush failures.

use thiserror::Error;

/// Central error type for `tidemark-recorder`.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The runs database could not be opened, migrated, or written to.
    #[error("recorder sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the database's parent directory failed.
    #[error("failed to create directory for runs database: {0}")]
    Io(#[from] std::io::Error),

    /// `config` or `metadata` failed to serialize to JSON.
    #[error("failed to serialize run config/metadata: {0}")]
    Serialization(#[from] serde_json::Error),
}
