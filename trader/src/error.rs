//! Error type for a failed or misconfigured backtest run.

use thiserror::Error;

/// Central error type for `tidemark-trader`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The run's catalog database could not be opened or read.
    #[error("datafeed error: {0}")]
    Data(#[from] tidemark_data::error::DataError),

    /// The run's recorder database could not be opened or written to.
    #[error("recorder error: {0}")]
    Recorder(#[from] tidemark_recorder::RecorderError),

    /// At least one strategy is required to run a backtest.
    #[error("orchestrator requires at least one strategy")]
    NoStrategies,
}
