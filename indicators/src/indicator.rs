//! The indicator contract: a bounded per-symbol history, written to by
//! `update` and read back through `latest`/`get`/`history`.

use crate::plot::{PlotColor, PlotStyle};
use indexmap::IndexMap;
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::collections::VecDeque;
use tidemark_core::events::BarReceived;

/// Per-symbol bounded FIFO of computed values.
///
/// The lock here covers only the append/read of the buffer itself — an
/// indicator's own computation (e.g. a moving-average window) runs
/// outside this lock, in whatever private state the indicator keeps.
/// Each symbol gets its own bounded deque the first time it is seen;
/// deques are never pre-allocated for symbols that never appear.
#[derive(Debug)]
pub struct HistoryBuffer {
    max_history: usize,
    data: Mutex<IndexMap<SmolStr, VecDeque<f64>>>,
}

impl HistoryBuffer {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            data: Mutex::new(IndexMap::new()),
        }
    }

    /// Append `value` to `symbol`'s series, evicting the oldest entry if
    /// the buffer is already at capacity.
    pub fn push(&self, symbol: &str, value: f64) {
        let mut data = self.data.lock();
        let deque = data
            .entry(SmolStr::new(symbol))
            .or_insert_with(|| VecDeque::with_capacity(self.max_history));
        if deque.len() == self.max_history {
            deque.pop_front();
        }
        deque.push_back(value);
    }

    /// Most recent value recorded for `symbol`, or `NaN` if `symbol` has
    /// never been seen.
    pub fn latest(&self, symbol: &str) -> f64 {
        self.data
            .lock()
            .get(symbol)
            .and_then(|d| d.back().copied())
            .unwrap_or(f64::NAN)
    }

    /// Python-deque-style indexing into `symbol`'s current buffer:
    /// non-negative indices count from the oldest retained value,
    /// negative indices count from the newest. Out-of-range indices and
    /// unknown symbols both return `NaN`.
    pub fn get(&self, symbol: &str, index: i64) -> f64 {
        let data = self.data.lock();
        let Some(deque) = data.get(symbol) else {
            return f64::NAN;
        };
        let len = deque.len() as i64;
        let position = if index >= 0 { index } else { len + index };
        if position < 0 || position >= len {
            return f64::NAN;
        }
        deque[position as usize]
    }

    /// Snapshot of `symbol`'s current buffer, oldest first. Empty for an
    /// unknown symbol.
    pub fn history(&self, symbol: &str) -> Vec<f64> {
        self.data
            .lock()
            .get(symbol)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Turns a stream of bars into a per-symbol series of `f64` values.
///
/// Implementations own their own private computation state (e.g. a
/// rolling window of raw field values) in addition to the
/// [`HistoryBuffer`] that stores their output; `update` takes `&self`
/// because an indicator may be shared (via `Arc`) across a strategy's
/// indicator fan-out and the panel it is plotted on.
pub trait Indicator: Send + Sync + std::fmt::Debug {
    /// Stable identifier combining the indicator's parameters, used as
    /// the key suffix in `BarProcessed.indicators`.
    fn name(&self) -> String;

    /// Consume one incoming bar, updating this indicator's private state
    /// and appending the newly computed value (or `NaN` during warm-up)
    /// to its history buffer.
    fn update(&self, bar: &BarReceived);

    /// Most recently computed value for `symbol`.
    fn latest(&self, symbol: &str) -> f64;

    /// Python-deque-style indexed read into `symbol`'s history.
    fn get(&self, symbol: &str, index: i64) -> f64;

    /// Full retained history for `symbol`, oldest first.
    fn history(&self, symbol: &str) -> Vec<f64>;

    /// Panel identifier forwarded to the recorder: `0` is the main price
    /// chart, `1..=98` are subcharts, `99` means "do not plot".
    fn plot_at(&self) -> u8 {
        99
    }

    /// Line style forwarded to the recorder.
    fn plot_style(&self) -> PlotStyle {
        PlotStyle::Line
    }

    /// Line color forwarded to the recorder.
    fn plot_color(&self) -> PlotColor {
        PlotColor::Black
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_symbol_returns_nan() {
        let buf = HistoryBuffer::new(10);
        assert!(buf.latest("AAPL").is_nan());
        assert!(buf.get("AAPL", -1).is_nan());
        assert!(buf.get("AAPL", 0).is_nan());
    }

    #[test]
    fn out_of_bounds_index_returns_nan() {
        let buf = HistoryBuffer::new(10);
        buf.push("AAPL", 100.0);
        assert!(buf.get("AAPL", 1).is_nan());
        assert!(buf.get("AAPL", -2).is_nan());
    }

    #[test]
    fn latest_matches_negative_one_index() {
        let buf = HistoryBuffer::new(10);
        buf.push("AAPL", 100.0);
        buf.push("AAPL", 101.5);
        assert_eq!(buf.latest("AAPL"), buf.get("AAPL", -1));
        assert_eq!(buf.get("AAPL", -1), 101.5);
    }

    #[test]
    fn per_symbol_isolation() {
        let buf = HistoryBuffer::new(10);
        buf.push("AAPL", 100.0);
        buf.push("MSFT", 200.0);
        buf.push("AAPL", 101.0);
        assert_eq!(buf.get("AAPL", -1), 101.0);
        assert_eq!(buf.get("MSFT", -1), 200.0);
    }

    #[test]
    fn max_history_bounds_buffer_and_shifts_positive_indices() {
        let buf = HistoryBuffer::new(3);
        buf.push("AAPL", 1.0);
        buf.push("AAPL", 2.0);
        buf.push("AAPL", 3.0);
        buf.push("AAPL", 4.0);
        assert_eq!(buf.get("AAPL", 0), 2.0);
        assert_eq!(buf.get("AAPL", 1), 3.0);
        assert_eq!(buf.get("AAPL", 2), 4.0);
        assert!(buf.get("AAPL", 3).is_nan());
    }
}
