//! Simple moving average over a chosen bar field.

use crate::bar::BarField;
use crate::indicator::{HistoryBuffer, Indicator};
use indexmap::IndexMap;
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::collections::VecDeque;
use tidemark_core::events::BarReceived;

/// Arithmetic mean of `bar_field` over the trailing `period` bars.
///
/// Reports `NaN` until the window is fully populated, and `NaN` for any
/// window that contains a bar with a missing field (currently only
/// possible for [`BarField::Volume`] on a bar with no reported volume).
#[derive(Debug)]
pub struct SimpleMovingAverage {
    period: usize,
    bar_field: BarField,
    windows: Mutex<IndexMap<SmolStr, VecDeque<Option<f64>>>>,
    history: HistoryBuffer,
}

impl SimpleMovingAverage {
    pub fn new(period: usize, bar_field: BarField, max_history: usize) -> Self {
        Self {
            period: period.max(1),
            bar_field,
            windows: Mutex::new(IndexMap::new()),
            history: HistoryBuffer::new(max_history),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for SimpleMovingAverage {
    fn default() -> Self {
        Self::new(20, BarField::Close, 100)
    }
}

impl Indicator for SimpleMovingAverage {
    fn name(&self) -> String {
        format!("SMA_{}_{}", self.period, self.bar_field.label())
    }

    fn update(&self, bar: &BarReceived) {
        let value = self.bar_field.extract(bar);
        let computed = {
            let mut windows = self.windows.lock();
            let window = windows
                .entry(bar.symbol.clone())
                .or_insert_with(|| VecDeque::with_capacity(self.period));
            if window.len() == self.period {
                window.pop_front();
            }
            window.push_back(value);
            if window.len() == self.period {
                let mut sum = 0.0;
                let mut complete = true;
                for entry in window.iter() {
                    match entry {
                        Some(v) => sum += v,
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                if complete {
                    Some(sum / self.period as f64)
                } else {
                    None
                }
            } else {
                None
            }
        };
        self.history.push(&bar.symbol, computed.unwrap_or(f64::NAN));
    }

    fn latest(&self, symbol: &str) -> f64 {
        self.history.latest(symbol)
    }

    fn get(&self, symbol: &str, index: i64) -> f64 {
        self.history.get(symbol, index)
    }

    fn history(&self, symbol: &str) -> Vec<f64> {
        self.history.history(symbol)
    }
}
