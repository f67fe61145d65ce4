//! Read-only SQLite secmaster reader.
//!
//! The schema mirrors a Databento-style market-data catalog: a
//! `publishers` table for data-vendor identity, `instruments` for the
//! tradable universe, `symbology` recording how a raw vendor symbol maps
//! to a human symbol over time, and `ohlcv` holding one row per bar with
//! prices scaled by `1e9` and stored as integers to keep the column
//! exact under SQLite's `INTEGER` affinity. `rtype` follows the vendor
//! encoding [`tidemark_core::model::BarPeriod::rtype`] already speaks:
//! 32/33/34/35 for SECOND/MINUTE/HOUR/DAY.

use crate::error::DataError;
use rusqlite::{params, Connection};
use std::path::Path;
use tidemark_core::model::BarPeriod;

/// Integer-to-float price scale used by the `ohlcv` table's OHLC columns.
const PRICE_SCALE: f64 = 1_000_000_000.0;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS publishers (
    publisher_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    dataset TEXT NOT NULL,
    venue TEXT
);

CREATE TABLE IF NOT EXISTS instruments (
    instrument_id INTEGER PRIMARY KEY,
    publisher_id INTEGER NOT NULL REFERENCES publishers(publisher_id),
    symbol TEXT NOT NULL,
    source_instrument_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_instruments_symbol ON instruments(symbol);

CREATE TABLE IF NOT EXISTS symbology (
    publisher_id INTEGER NOT NULL REFERENCES publishers(publisher_id),
    symbol TEXT NOT NULL,
    source_instrument_id TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ohlcv (
    instrument_id INTEGER NOT NULL REFERENCES instruments(instrument_id),
    rtype INTEGER NOT NULL,
    ts_event INTEGER NOT NULL,
    open INTEGER NOT NULL,
    high INTEGER NOT NULL,
    low INTEGER NOT NULL,
    close INTEGER NOT NULL,
    volume INTEGER
);
CREATE INDEX IF NOT EXISTS idx_ohlcv_instrument_rtype_ts ON ohlcv(instrument_id, rtype, ts_event);
"#;

/// One bar as read back from the catalog, prices already descaled to
/// plain floating-point units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogBar {
    pub ts_event_ns: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}

/// A read-only (from this crate's perspective) SQLite-backed secmaster.
///
/// Ingestion is out of scope here; the schema is created if missing so
/// tests and small local runs can seed a catalog from scratch, but the
/// only operation this type exposes beyond construction is the bar
/// query the datafeed drives itself from.
#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open (creating if necessary) the secmaster database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// An in-memory catalog, for tests and demos that don't need a file.
    pub fn open_in_memory() -> Result<Self, DataError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Every bar for `symbol` at `bar_period`, in ascending timestamp
    /// order. An unknown symbol yields an empty vector rather than an
    /// error, matching the over-approximation read model: the caller
    /// asked for a symbol that exists nowhere in this catalog, which is
    /// not itself a catalog failure.
    pub fn bars_for_symbol(&self, symbol: &str, bar_period: BarPeriod) -> Result<Vec<CatalogBar>, DataError> {
        let mut stmt = self.conn.prepare(
            "SELECT o.ts_event, o.open, o.high, o.low, o.close, o.volume
             FROM ohlcv o
             JOIN instruments i ON i.instrument_id = o.instrument_id
             WHERE i.symbol = ?1 AND o.rtype = ?2
             ORDER BY o.ts_event ASC",
        )?;
        let rows = stmt.query_map(params![symbol, bar_period.rtype()], |row| {
            Ok(CatalogBar {
                ts_event_ns: row.get(0)?,
                open: row.get::<_, i64>(1)? as f64 / PRICE_SCALE,
                high: row.get::<_, i64>(2)? as f64 / PRICE_SCALE,
                low: row.get::<_, i64>(3)? as f64 / PRICE_SCALE,
                close: row.get::<_, i64>(4)? as f64 / PRICE_SCALE,
                volume: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DataError::from)
    }

    /// Insert a publisher row, returning its id, for seeding a catalog in
    /// tests and ingestion tooling.
    pub fn insert_publisher(&self, name: &str, dataset: &str, venue: Option<&str>) -> Result<i64, DataError> {
        self.conn.execute(
            "INSERT INTO publishers (name, dataset, venue) VALUES (?1, ?2, ?3)",
            params![name, dataset, venue],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert an instrument row, returning its id.
    pub fn insert_instrument(&self, publisher_id: i64, symbol: &str) -> Result<i64, DataError> {
        self.conn.execute(
            "INSERT INTO instruments (publisher_id, symbol) VALUES (?1, ?2)",
            params![publisher_id, symbol],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert one bar, with prices already scaled by [`PRICE_SCALE`] by
    /// the caller (see [`Catalog::insert_bar_unscaled`] for the common
    /// case of inserting plain float prices).
    pub fn insert_bar_scaled(
        &self,
        instrument_id: i64,
        bar_period: BarPeriod,
        ts_event_ns: i64,
        open: i64,
        high: i64,
        low: i64,
        close: i64,
        volume: Option<i64>,
    ) -> Result<(), DataError> {
        self.conn.execute(
            "INSERT INTO ohlcv (instrument_id, rtype, ts_event, open, high, low, close, volume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![instrument_id, bar_period.rtype(), ts_event_ns, open, high, low, close, volume],
        )?;
        Ok(())
    }

    /// Insert one bar from plain floating-point prices, scaling them for
    /// storage. The common path for seeding a catalog in tests.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_bar_unscaled(
        &self,
        instrument_id: i64,
        bar_period: BarPeriod,
        ts_event_ns: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<i64>,
    ) -> Result<(), DataError> {
        self.insert_bar_scaled(
            instrument_id,
            bar_period,
            ts_event_ns,
            (open * PRICE_SCALE).round() as i64,
            (high * PRICE_SCALE).round() as i64,
            (low * PRICE_SCALE).round() as i64,
            (close * PRICE_SCALE).round() as i64,
            volume,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        let publisher_id = catalog.insert_publisher("DATABENTO", "XNAS.ITCH", Some("XNAS")).unwrap();
        let instrument_id = catalog.insert_instrument(publisher_id, "AAPL").unwrap();
        catalog
            .insert_bar_unscaled(instrument_id, BarPeriod::Minute, 100, 10.0, 11.0, 9.0, 10.5, Some(1_000))
            .unwrap();
        catalog
            .insert_bar_unscaled(instrument_id, BarPeriod::Minute, 200, 10.5, 12.0, 10.0, 11.5, Some(2_000))
            .unwrap();
        catalog
    }

    #[test]
    fn bars_come_back_in_ascending_timestamp_order() {
        let catalog = seeded();
        let bars = catalog.bars_for_symbol("AAPL", BarPeriod::Minute).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].ts_event_ns < bars[1].ts_event_ns);
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[1].close, 11.5);
    }

    #[test]
    fn unknown_symbol_returns_empty_not_an_error() {
        let catalog = seeded();
        let bars = catalog.bars_for_symbol("MSFT", BarPeriod::Minute).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn wrong_bar_period_excludes_the_rows() {
        let catalog = seeded();
        let bars = catalog.bars_for_symbol("AAPL", BarPeriod::Day).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn price_scaling_round_trips_through_storage() {
        let catalog = seeded();
        let bars = catalog.bars_for_symbol("AAPL", BarPeriod::Minute).unwrap();
        assert_eq!(bars[0].volume, Some(1_000));
    }

    #[test]
    fn open_creates_the_database_file_and_its_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secmaster.db");
        {
            let catalog = Catalog::open(&path).unwrap();
            let publisher_id = catalog.insert_publisher("DATABENTO", "XNAS.ITCH", None).unwrap();
            let instrument_id = catalog.insert_instrument(publisher_id, "AAPL").unwrap();
            catalog
                .insert_bar_unscaled(instrument_id, BarPeriod::Day, 1, 1.0, 1.0, 1.0, 1.0, None)
                .unwrap();
        }
        assert!(path.is_file());
        let reopened = Catalog::open(&path).unwrap();
        assert_eq!(reopened.bars_for_symbol("AAPL", BarPeriod::Day).unwrap().len(), 1);
    }
}
