//! `RunRecorder`: a subscriber that buffers every event kind into its own
//! table-shaped `Vec` and flushes each in a batched transaction.

use crate::error::RecorderError;
use rusqlite::{params, Connection};
use std::path::Path;
use tidemark_core::events::{
    BarProcessed, BarReceived, CancellationAccepted, CancellationRejected, Event, EventKind, FillEvent,
    ModificationAccepted, ModificationRejected, OrderAccepted, OrderCancellationRequest, OrderExpired,
    OrderModificationRequest, OrderRejected, OrderSubmissionRequest,
};
use tidemark_core::ids::RunId;
use tidemark_core::model::{
    ActionType, BarPeriod, CancellationRejectionReason, ModificationRejectionReason, OrderRejectionReason,
    OrderType, TradeSide,
};
use tidemark_core::subscriber::Subscriber;

/// Every event kind the recorder subscribes to: the entire taxonomy.
pub const SUBSCRIBED_EVENT_KINDS: &[EventKind] = &[
    EventKind::BarReceived,
    EventKind::BarProcessed,
    EventKind::OrderSubmissionRequest,
    EventKind::OrderCancellationRequest,
    EventKind::OrderModificationRequest,
    EventKind::OrderAccepted,
    EventKind::OrderRejected,
    EventKind::ModificationAccepted,
    EventKind::ModificationRejected,
    EventKind::CancellationAccepted,
    EventKind::CancellationRejected,
    EventKind::FillEvent,
    EventKind::OrderExpired,
];

/// Buffered rows are flushed once this many have accumulated for a
/// single table, in addition to the unconditional flush-all on shutdown.
pub const BATCH_SIZE: usize = 1000;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    ts_start INTEGER NOT NULL,
    ts_end INTEGER,
    status TEXT NOT NULL,
    config TEXT,
    metadata TEXT
);

CREATE TABLE IF NOT EXISTS bars (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    symbol TEXT NOT NULL,
    bar_period TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume INTEGER
);

CREATE TABLE IF NOT EXISTS bars_processed (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    symbol TEXT NOT NULL,
    bar_period TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume INTEGER,
    indicators TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_submissions (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    system_order_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    order_type TEXT NOT NULL,
    side TEXT NOT NULL,
    quantity REAL NOT NULL,
    limit_price REAL,
    stop_price REAL,
    action TEXT,
    signal TEXT
);

CREATE TABLE IF NOT EXISTS order_cancellations (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    system_order_id TEXT NOT NULL,
    symbol TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_modifications (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    system_order_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    quantity REAL,
    limit_price REAL,
    stop_price REAL
);

CREATE TABLE IF NOT EXISTS orders_accepted (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    broker_order_id TEXT
);

CREATE TABLE IF NOT EXISTS orders_rejected (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    rejection_reason TEXT NOT NULL,
    rejection_message TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cancellations_accepted (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    broker_order_id TEXT
);

CREATE TABLE IF NOT EXISTS cancellations_rejected (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    rejection_reason TEXT NOT NULL,
    rejection_message TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS modifications_accepted (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    broker_order_id TEXT
);

CREATE TABLE IF NOT EXISTS modifications_rejected (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    rejection_reason TEXT NOT NULL,
    rejection_message TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fills (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    broker_order_id TEXT,
    symbol TEXT NOT NULL,
    fill_id TEXT NOT NULL,
    broker_fill_id TEXT,
    side TEXT NOT NULL,
    quantity_filled REAL NOT NULL,
    fill_price REAL NOT NULL,
    commission REAL NOT NULL,
    exchange TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS expirations (
    run_id TEXT NOT NULL REFERENCES runs(run_id),
    ts_event_ns INTEGER NOT NULL,
    ts_created_ns INTEGER NOT NULL,
    ts_broker_ns INTEGER NOT NULL,
    associated_order_id TEXT NOT NULL,
    broker_order_id TEXT,
    symbol TEXT NOT NULL
);
"#;

fn bar_period_label(period: BarPeriod) -> &'static str {
    match period {
        BarPeriod::Second => "SECOND",
        BarPeriod::Minute => "MINUTE",
        BarPeriod::Hour => "HOUR",
        BarPeriod::Day => "DAY",
    }
}

fn order_type_label(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "MARKET",
        OrderType::Limit => "LIMIT",
        OrderType::Stop => "STOP",
        OrderType::StopLimit => "STOP_LIMIT",
    }
}

fn side_label(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Buy => "BUY",
        TradeSide::Sell => "SELL",
    }
}

fn action_label(action: ActionType) -> &'static str {
    match action {
        ActionType::Entry => "ENTRY",
        ActionType::EntryLong => "ENTRY_LONG",
        ActionType::EntryShort => "ENTRY_SHORT",
        ActionType::Exit => "EXIT",
        ActionType::ExitLong => "EXIT_LONG",
        ActionType::ExitShort => "EXIT_SHORT",
        ActionType::Add => "ADD",
        ActionType::Reduce => "REDUCE",
        ActionType::Reverse => "REVERSE",
    }
}

fn order_rejection_label(reason: OrderRejectionReason) -> &'static str {
    match reason {
        OrderRejectionReason::Unknown => "UNKNOWN",
    }
}

fn cancellation_rejection_label(reason: CancellationRejectionReason) -> &'static str {
    match reason {
        CancellationRejectionReason::Unknown => "UNKNOWN",
    }
}

fn modification_rejection_label(reason: ModificationRejectionReason) -> &'static str {
    match reason {
        ModificationRejectionReason::Unknown => "UNKNOWN",
    }
}

#[derive(Default)]
struct Buffers {
    bars: Vec<BarReceived>,
    bars_processed: Vec<BarProcessed>,
    order_submissions: Vec<OrderSubmissionRequest>,
    order_cancellations: Vec<OrderCancellationRequest>,
    order_modifications: Vec<OrderModificationRequest>,
    orders_accepted: Vec<OrderAccepted>,
    orders_rejected: Vec<OrderRejected>,
    cancellations_accepted: Vec<CancellationAccepted>,
    cancellations_rejected: Vec<CancellationRejected>,
    modifications_accepted: Vec<ModificationAccepted>,
    modifications_rejected: Vec<ModificationRejected>,
    fills: Vec<FillEvent>,
    expirations: Vec<OrderExpired>,
}

/// Run a buffered `Vec<T>` through one transaction, one `INSERT` per
/// row, then clear it. The transaction is what turns `BATCH_SIZE`
/// inserts into one fsync instead of `BATCH_SIZE` of them.
fn flush_buffer<T>(
    conn: &mut Connection,
    sql: &str,
    buffer: &mut Vec<T>,
    bind: impl Fn(&T) -> Vec<&dyn rusqlite::ToSql>,
) -> Result<(), RecorderError> {
    if buffer.is_empty() {
        return Ok(());
    }
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(sql)?;
        for row in buffer.iter() {
            stmt.execute(bind(row).as_slice())?;
        }
    }
    tx.commit()?;
    buffer.clear();
    Ok(())
}

struct RecorderInner {
    conn: Connection,
    run_id: String,
    buffers: Buffers,
}

impl RecorderInner {
    fn flush_all(&mut self) -> Result<(), RecorderError> {
        let run_id = self.run_id.clone();
        flush_buffer(
            &mut self.conn,
            "INSERT INTO bars (run_id, ts_event_ns, ts_created_ns, symbol, bar_period, open, high, low, close, volume) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            &mut self.buffers.bars,
            |b| {
                vec![
                    &run_id,
                    &b.ts_event_ns,
                    &b.ts_created_ns,
                    &b.symbol.as_str(),
                    &bar_period_label(b.bar_period),
                    &b.open,
                    &b.high,
                    &b.low,
                    &b.close,
                    &b.volume,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO bars_processed (run_id, ts_event_ns, ts_created_ns, symbol, bar_period, open, high, low, close, volume, indicators) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            &mut self.buffers.bars_processed,
            |b| {
                vec![
                    &run_id,
                    &b.ts_event_ns,
                    &b.ts_created_ns,
                    &b.symbol.as_str(),
                    &bar_period_label(b.bar_period),
                    &b.open,
                    &b.high,
                    &b.low,
                    &b.close,
                    &b.volume,
                    &b.indicators_json,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO order_submissions (run_id, ts_event_ns, ts_created_ns, system_order_id, symbol, order_type, side, quantity, limit_price, stop_price, action, signal) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            &mut self.buffers.order_submissions,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.system_order_id_str,
                    &r.symbol.as_str(),
                    &order_type_label(r.order_type),
                    &side_label(r.side),
                    &r.quantity,
                    &r.limit_price,
                    &r.stop_price,
                    &r.action_label,
                    &r.signal,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO order_cancellations (run_id, ts_event_ns, ts_created_ns, system_order_id, symbol) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &mut self.buffers.order_cancellations,
            |r| vec![&run_id, &r.ts_event_ns, &r.ts_created_ns, &r.system_order_id_str, &r.symbol.as_str()],
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO order_modifications (run_id, ts_event_ns, ts_created_ns, system_order_id, symbol, quantity, limit_price, stop_price) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            &mut self.buffers.order_modifications,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.system_order_id_str,
                    &r.symbol.as_str(),
                    &r.quantity,
                    &r.limit_price,
                    &r.stop_price,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO orders_accepted (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, broker_order_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &mut self.buffers.orders_accepted,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.ts_broker_ns,
                    &r.associated_order_id_str,
                    &r.broker_order_id_str,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO orders_rejected (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, rejection_reason, rejection_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &mut self.buffers.orders_rejected,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.ts_broker_ns,
                    &r.associated_order_id_str,
                    &r.reason_label,
                    &r.rejection_message,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO cancellations_accepted (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, broker_order_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &mut self.buffers.cancellations_accepted,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.ts_broker_ns,
                    &r.associated_order_id_str,
                    &r.broker_order_id_str,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO cancellations_rejected (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, rejection_reason, rejection_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &mut self.buffers.cancellations_rejected,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.ts_broker_ns,
                    &r.associated_order_id_str,
                    &r.reason_label,
                    &r.rejection_message,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO modifications_accepted (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, broker_order_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &mut self.buffers.modifications_accepted,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.ts_broker_ns,
                    &r.associated_order_id_str,
                    &r.broker_order_id_str,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO modifications_rejected (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, rejection_reason, rejection_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &mut self.buffers.modifications_rejected,
            |r| {
                vec![
                    &run_id,
                    &r.ts_event_ns,
                    &r.ts_created_ns,
                    &r.ts_broker_ns,
                    &r.associated_order_id_str,
                    &r.reason_label,
                    &r.rejection_message,
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO fills (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, broker_order_id, symbol, fill_id, broker_fill_id, side, quantity_filled, fill_price, commission, exchange) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            &mut self.buffers.fills,
            |f| {
                vec![
                    &run_id,
                    &f.ts_event_ns,
                    &f.ts_created_ns,
                    &f.ts_broker_ns,
                    &f.associated_order_id_str,
                    &f.broker_order_id_str,
                    &f.symbol.as_str(),
                    &f.fill_id_str,
                    &f.broker_fill_id,
                    &side_label(f.side),
                    &f.quantity_filled,
                    &f.fill_price,
                    &f.commission,
                    &f.exchange.as_str(),
                ]
            },
        )?;

        flush_buffer(
            &mut self.conn,
            "INSERT INTO expirations (run_id, ts_event_ns, ts_created_ns, ts_broker_ns, associated_order_id, broker_order_id, symbol) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &mut self.buffers.expirations,
            |e| {
                vec![
                    &run_id,
                    &e.ts_event_ns,
                    &e.ts_created_ns,
                    &e.ts_broker_ns,
                    &e.associated_order_id_str,
                    &e.broker_order_id_str,
                    &e.symbol.as_str(),
                ]
            },
        )?;

        Ok(())
    }
}

/// A [`tidemark_core::subscriber::Subscriber`] that persists every event
/// kind to a per-run SQLite database, plus the `runs` row that tracks
/// this invocation's lifecycle.
///
/// Cheap to clone: the SQLite connection and buffers live behind an
/// `Arc<Mutex<_>>`, so the orchestrator can hold its own handle for
/// [`RunRecorder::update_run_status`] while a separate clone runs inside
/// a [`tidemark_core::subscriber::SubscriberWorker`] as the bus subscriber.
#[derive(Clone)]
pub struct RunRecorder {
    inner: std::sync::Arc<parking_lot::Mutex<RecorderInner>>,
}

impl std::fmt::Debug for RunRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRecorder").finish_non_exhaustive()
    }
}

impl RunRecorder {
    /// Open (creating if necessary) the runs database at `db_path` and
    /// register a new row in `runs` with status `"running"`.
    pub fn new(
        db_path: impl AsRef<Path>,
        run_id: RunId,
        name: impl Into<String>,
        config: Option<serde_json::Value>,
        metadata: Option<serde_json::Value>,
        ts_start_ns: i64,
    ) -> Result<Self, RecorderError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(SCHEMA)?;

        let run_id_string = run_id.as_str().to_string();
        let config_json = config.map(|v| serde_json::to_string(&v)).transpose()?;
        let metadata_json = metadata.map(|v| serde_json::to_string(&v)).transpose()?;

        {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO runs (run_id, name, ts_start, status, config, metadata) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![run_id_string, name.into(), ts_start_ns, "running", config_json, metadata_json],
            )?;
            tx.commit()?;
        }

        Ok(Self {
            inner: std::sync::Arc::new(parking_lot::Mutex::new(RecorderInner {
                conn,
                run_id: run_id_string,
                buffers: Buffers::default(),
            })),
        })
    }

    /// Update the `runs` row's `status` and `ts_end`. Called directly by
    /// the orchestrator after the run loop finishes or fails, not routed
    /// through the bus.
    pub fn update_run_status(&self, status: &str, ts_end_ns: i64) -> Result<(), RecorderError> {
        let inner = self.inner.lock();
        inner.conn.execute(
            "UPDATE runs SET status = ?1, ts_end = ?2 WHERE run_id = ?3",
            params![status, ts_end_ns, inner.run_id],
        )?;
        Ok(())
    }
}

macro_rules! buffer_and_maybe_flush {
    ($inner:expr, $field:ident, $value:expr) => {{
        $inner.buffers.$field.push($value);
        if $inner.buffers.$field.len() >= BATCH_SIZE {
            if let Err(err) = $inner.flush_all() {
                panic!("recorder flush failed: {err}");
            }
        }
    }};
}

impl Subscriber for RunRecorder {
    fn name(&self) -> &str {
        "run-recorder"
    }

    fn on_event(&mut self, event: Event) {
        let mut inner = self.inner.lock();
        match event {
            Event::BarReceived(bar) => buffer_and_maybe_flush!(inner, bars, bar),
            Event::BarProcessed(bar) => {
                let row = BarProcessedRow::from(bar);
                buffer_and_maybe_flush!(inner, bars_processed, row)
            }
            Event::OrderSubmissionRequest(request) => {
                let row = OrderSubmissionRow::from(request);
                buffer_and_maybe_flush!(inner, order_submissions, row)
            }
            Event::OrderCancellationRequest(request) => {
                let row = OrderCancellationRow::from(request);
                buffer_and_maybe_flush!(inner, order_cancellations, row)
            }
            Event::OrderModificationRequest(request) => {
                let row = OrderModificationRow::from(request);
                buffer_and_maybe_flush!(inner, order_modifications, row)
            }
            Event::OrderAccepted(accepted) => {
                let row = AcceptedRow::from(accepted);
                buffer_and_maybe_flush!(inner, orders_accepted, row)
            }
            Event::OrderRejected(rejected) => {
                let row = RejectedRow::from(rejected);
                buffer_and_maybe_flush!(inner, orders_rejected, row)
            }
            Event::ModificationAccepted(accepted) => {
                let row = AcceptedRow::from(accepted);
                buffer_and_maybe_flush!(inner, modifications_accepted, row)
            }
            Event::ModificationRejected(rejected) => {
                let row = RejectedRow::from(rejected);
                buffer_and_maybe_flush!(inner, modifications_rejected, row)
            }
            Event::CancellationAccepted(accepted) => {
                let row = AcceptedRow::from(accepted);
                buffer_and_maybe_flush!(inner, cancellations_accepted, row)
            }
            Event::CancellationRejected(rejected) => {
                let row = RejectedRow::from(rejected);
                buffer_and_maybe_flush!(inner, cancellations_rejected, row)
            }
            Event::FillEvent(fill) => {
                let row = FillRow::from(fill);
                buffer_and_maybe_flush!(inner, fills, row)
            }
            Event::OrderExpired(expired) => {
                let row = ExpirationRow::from(expired);
                buffer_and_maybe_flush!(inner, expirations, row)
            }
        }
    }

    fn cleanup(&mut self) {
        let mut inner = self.inner.lock();
        if let Err(err) = inner.flush_all() {
            tracing::error!(%err, "recorder failed to flush on shutdown");
        }
    }
}

/// `BarProcessed` with its indicator map pre-serialized to JSON once, at
/// buffer-push time rather than at flush time.
struct BarProcessedRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    symbol: smol_str::SmolStr,
    bar_period: BarPeriod,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<i64>,
    indicators_json: String,
}

impl From<BarProcessed> for BarProcessedRow {
    fn from(bar: BarProcessed) -> Self {
        Self {
            ts_event_ns: bar.ts_event_ns,
            ts_created_ns: bar.ts_created_ns,
            symbol: bar.symbol,
            bar_period: bar.bar_period,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            indicators_json: serde_json::to_string(&bar.indicators).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}

struct OrderSubmissionRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    system_order_id_str: String,
    symbol: smol_str::SmolStr,
    order_type: OrderType,
    side: TradeSide,
    quantity: f64,
    limit_price: Option<f64>,
    stop_price: Option<f64>,
    action_label: Option<&'static str>,
    signal: Option<smol_str::SmolStr>,
}

impl From<OrderSubmissionRequest> for OrderSubmissionRow {
    fn from(request: OrderSubmissionRequest) -> Self {
        Self {
            ts_event_ns: request.ts_event_ns,
            ts_created_ns: request.ts_created_ns,
            system_order_id_str: request.system_order_id.to_string(),
            symbol: request.symbol,
            order_type: request.order_type,
            side: request.side,
            quantity: request.quantity,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            action_label: request.action.map(action_label),
            signal: request.signal,
        }
    }
}

struct OrderCancellationRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    system_order_id_str: String,
    symbol: smol_str::SmolStr,
}

impl From<OrderCancellationRequest> for OrderCancellationRow {
    fn from(request: OrderCancellationRequest) -> Self {
        Self {
            ts_event_ns: request.ts_event_ns,
            ts_created_ns: request.ts_created_ns,
            system_order_id_str: request.system_order_id.to_string(),
            symbol: request.symbol,
        }
    }
}

struct OrderModificationRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    system_order_id_str: String,
    symbol: smol_str::SmolStr,
    quantity: Option<f64>,
    limit_price: Option<f64>,
    stop_price: Option<f64>,
}

impl From<OrderModificationRequest> for OrderModificationRow {
    fn from(request: OrderModificationRequest) -> Self {
        Self {
            ts_event_ns: request.ts_event_ns,
            ts_created_ns: request.ts_created_ns,
            system_order_id_str: request.system_order_id.to_string(),
            symbol: request.symbol,
            quantity: request.quantity,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
        }
    }
}

/// Shared shape of the four "accepted" response events.
struct AcceptedRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    ts_broker_ns: i64,
    associated_order_id_str: String,
    broker_order_id_str: Option<String>,
}

impl From<OrderAccepted> for AcceptedRow {
    fn from(accepted: OrderAccepted) -> Self {
        Self {
            ts_event_ns: accepted.ts_event_ns,
            ts_created_ns: accepted.ts_created_ns,
            ts_broker_ns: accepted.ts_broker_ns,
            associated_order_id_str: accepted.associated_order_id.to_string(),
            broker_order_id_str: accepted.broker_order_id.map(|id| id.to_string()),
        }
    }
}

impl From<ModificationAccepted> for AcceptedRow {
    fn from(accepted: ModificationAccepted) -> Self {
        Self {
            ts_event_ns: accepted.ts_event_ns,
            ts_created_ns: accepted.ts_created_ns,
            ts_broker_ns: accepted.ts_broker_ns,
            associated_order_id_str: accepted.associated_order_id.to_string(),
            broker_order_id_str: accepted.broker_order_id.map(|id| id.to_string()),
        }
    }
}

impl From<CancellationAccepted> for AcceptedRow {
    fn from(accepted: CancellationAccepted) -> Self {
        Self {
            ts_event_ns: accepted.ts_event_ns,
            ts_created_ns: accepted.ts_created_ns,
            ts_broker_ns: accepted.ts_broker_ns,
            associated_order_id_str: accepted.associated_order_id.to_string(),
            broker_order_id_str: accepted.broker_order_id.map(|id| id.to_string()),
        }
    }
}

/// Shared shape of the three "rejected" response events.
struct RejectedRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    ts_broker_ns: i64,
    associated_order_id_str: String,
    reason_label: &'static str,
    rejection_message: String,
}

impl From<OrderRejected> for RejectedRow {
    fn from(rejected: OrderRejected) -> Self {
        Self {
            ts_event_ns: rejected.ts_event_ns,
            ts_created_ns: rejected.ts_created_ns,
            ts_broker_ns: rejected.ts_broker_ns,
            associated_order_id_str: rejected.associated_order_id.to_string(),
            reason_label: order_rejection_label(rejected.rejection_reason),
            rejection_message: rejected.rejection_message,
        }
    }
}

impl From<ModificationRejected> for RejectedRow {
    fn from(rejected: ModificationRejected) -> Self {
        Self {
            ts_event_ns: rejected.ts_event_ns,
            ts_created_ns: rejected.ts_created_ns,
            ts_broker_ns: rejected.ts_broker_ns,
            associated_order_id_str: rejected.associated_order_id.to_string(),
            reason_label: modification_rejection_label(rejected.rejection_reason),
            rejection_message: rejected.rejection_message,
        }
    }
}

impl From<CancellationRejected> for RejectedRow {
    fn from(rejected: CancellationRejected) -> Self {
        Self {
            ts_event_ns: rejected.ts_event_ns,
            ts_created_ns: rejected.ts_created_ns,
            ts_broker_ns: rejected.ts_broker_ns,
            associated_order_id_str: rejected.associated_order_id.to_string(),
            reason_label: cancellation_rejection_label(rejected.rejection_reason),
            rejection_message: rejected.rejection_message,
        }
    }
}

struct FillRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    ts_broker_ns: i64,
    associated_order_id_str: String,
    broker_order_id_str: Option<String>,
    symbol: smol_str::SmolStr,
    fill_id_str: String,
    broker_fill_id: Option<String>,
    side: TradeSide,
    quantity_filled: f64,
    fill_price: f64,
    commission: f64,
    exchange: smol_str::SmolStr,
}

impl From<FillEvent> for FillRow {
    fn from(fill: FillEvent) -> Self {
        Self {
            ts_event_ns: fill.ts_event_ns,
            ts_created_ns: fill.ts_created_ns,
            ts_broker_ns: fill.ts_broker_ns,
            associated_order_id_str: fill.associated_order_id.to_string(),
            broker_order_id_str: fill.broker_order_id.map(|id| id.to_string()),
            symbol: fill.symbol,
            fill_id_str: fill.fill_id.to_string(),
            broker_fill_id: fill.broker_fill_id,
            side: fill.side,
            quantity_filled: fill.quantity_filled,
            fill_price: fill.fill_price,
            commission: fill.commission,
            exchange: fill.exchange,
        }
    }
}

struct ExpirationRow {
    ts_event_ns: i64,
    ts_created_ns: i64,
    ts_broker_ns: i64,
    associated_order_id_str: String,
    broker_order_id_str: Option<String>,
    symbol: smol_str::SmolStr,
}

impl From<OrderExpired> for ExpirationRow {
    fn from(expired: OrderExpired) -> Self {
        Self {
            ts_event_ns: expired.ts_event_ns,
            ts_created_ns: expired.ts_created_ns,
            ts_broker_ns: expired.ts_broker_ns,
            associated_order_id_str: expired.associated_order_id.to_string(),
            broker_order_id_str: expired.broker_order_id.map(|id| id.to_string()),
            symbol: expired.symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::ids::SystemOrderId;
    use tidemark_core::model::BarPeriod;

    fn recorder_at(path: &Path) -> RunRecorder {
        RunRecorder::new(path, RunId::new("2026-07-26_00-00-00_Test"), "Test", None, None, 0).unwrap()
    }

    fn bar() -> BarReceived {
        BarReceived {
            ts_event_ns: 1,
            ts_created_ns: 1,
            symbol: "AAPL".into(),
            bar_period: BarPeriod::Minute,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: Some(10),
        }
    }

    #[test]
    fn registering_a_run_inserts_a_running_row() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder_at(&dir.path().join("runs.db"));
        let inner = recorder.inner.lock();
        let status: String =
            inner.conn.query_row("SELECT status FROM runs WHERE run_id = ?1", params![inner.run_id], |row| row.get(0)).unwrap();
        assert_eq!(status, "running");
    }

    #[test]
    fn update_run_status_sets_status_and_ts_end() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder_at(&dir.path().join("runs.db"));
        recorder.update_run_status("completed", 42).unwrap();
        let inner = recorder.inner.lock();
        let (status, ts_end): (String, i64) = inner
            .conn
            .query_row("SELECT status, ts_end FROM runs WHERE run_id = ?1", params![inner.run_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(status, "completed");
        assert_eq!(ts_end, 42);
    }

    #[test]
    fn bar_received_is_buffered_but_not_flushed_below_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_at(&dir.path().join("runs.db"));
        recorder.on_event(Event::BarReceived(bar()));
        let inner = recorder.inner.lock();
        assert_eq!(inner.buffers.bars.len(), 1);
        let count: i64 = inner.conn.query_row("SELECT COUNT(*) FROM bars", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn cleanup_flushes_every_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_at(&dir.path().join("runs.db"));
        recorder.on_event(Event::BarReceived(bar()));
        recorder.cleanup();
        let inner = recorder.inner.lock();
        assert!(inner.buffers.bars.is_empty());
        let count: i64 = inner.conn.query_row("SELECT COUNT(*) FROM bars", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn fill_event_round_trips_through_the_fills_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_at(&dir.path().join("runs.db"));
        let fill = FillEvent {
            ts_event_ns: 1,
            ts_created_ns: 1,
            ts_broker_ns: 1,
            fill_id: tidemark_core::ids::FillId::new(),
            broker_fill_id: None,
            associated_order_id: SystemOrderId::new(),
            broker_order_id: None,
            symbol: "AAPL".into(),
            side: TradeSide::Buy,
            quantity_filled: 10.0,
            fill_price: 100.0,
            commission: 1.0,
            exchange: "SIM".into(),
        };
        recorder.on_event(Event::FillEvent(fill));
        recorder.cleanup();
        let inner = recorder.inner.lock();
        let (symbol, price): (String, f64) =
            inner.conn.query_row("SELECT symbol, fill_price FROM fills", [], |row| Ok((row.get(0)?, row.get(1)?))).unwrap();
        assert_eq!(symbol, "AAPL");
        assert_eq!(price, 100.0);
    }
}
