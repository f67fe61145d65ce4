//! Error type for catalog access and datafeed lifecycle failures.

use thiserror::Error;

/// Central error type for `tidemark-data`.
#[derive(Debug, Error)]
pub enum DataError {
    /// The catalog's SQLite connection could not be opened or queried.
    #[error("catalog sqlite error: {0}")]
    Catalog(#[from] rusqlite::Error),

    /// A symbol named in a `subscribe` call matches no instrument in the
    /// catalog for the requested publisher.
    #[error("unknown symbol {0:?} in catalog")]
    UnknownSymbol(String),

    /// `wait_until_complete` or `disconnect` was called before `connect`.
    #[error("datafeed is not connected")]
    NotConnected,
}
