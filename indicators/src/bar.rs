//! OHLCV passthrough indicators: the five base series every strategy can
//! reference without writing its own computation. Their keys are
//! excluded from `BarProcessed.indicators` (the recorder and the
//! strategy runtime both special-case them as already present on the
//! bar itself), but they remain ordinary [`Indicator`] implementations so
//! they can serve as the `source` of a [`crate::period_extreme::PeriodExtreme`].

use crate::indicator::{HistoryBuffer, Indicator};
use crate::plot::{PlotColor, PlotStyle};
use serde::{Deserialize, Serialize};
use tidemark_core::events::BarReceived;

/// Selects which field of a bar an indicator reads.
///
/// `Volume` yields `None` on a bar with no reported volume, which
/// propagates as `NaN` through every indicator built on top of it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl BarField {
    /// Upper-case label used in indicator names, e.g. `"CLOSE"`.
    pub fn label(self) -> &'static str {
        match self {
            BarField::Open => "OPEN",
            BarField::High => "HIGH",
            BarField::Low => "LOW",
            BarField::Close => "CLOSE",
            BarField::Volume => "VOLUME",
        }
    }

    /// Extract this field from `bar`. `None` only for `Volume` on a bar
    /// with no reported volume.
    pub fn extract(self, bar: &BarReceived) -> Option<f64> {
        match self {
            BarField::Open => Some(bar.open),
            BarField::High => Some(bar.high),
            BarField::Low => Some(bar.low),
            BarField::Close => Some(bar.close),
            BarField::Volume => bar.volume.map(|v| v as f64),
        }
    }
}

macro_rules! passthrough_indicator {
    ($ty:ident, $field:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug)]
        pub struct $ty {
            history: HistoryBuffer,
        }

        impl $ty {
            pub fn new(max_history: usize) -> Self {
                Self {
                    history: HistoryBuffer::new(max_history),
                }
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new(100)
            }
        }

        impl Indicator for $ty {
            fn name(&self) -> String {
                $field.label().to_string()
            }

            fn update(&self, bar: &BarReceived) {
                let value = $field.extract(bar).unwrap_or(f64::NAN);
                self.history.push(&bar.symbol, value);
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

            fn plot_at(&self) -> u8 {
                0
            }

            fn plot_style(&self) -> PlotStyle {
                PlotStyle::Line
            }

            fn plot_color(&self) -> PlotColor {
                PlotColor::Black
            }
        }
    };
}

passthrough_indicator!(Open, BarField::Open, "Passthrough of a bar's open price.");
passthrough_indicator!(High, BarField::High, "Passthrough of a bar's high price.");
passthrough_indicator!(Low, BarField::Low, "Passthrough of a bar's low price.");
passthrough_indicator!(Close, BarField::Close, "Passthrough of a bar's close price.");
passthrough_indicator!(Volume, BarField::Volume, "Passthrough of a bar's volume, NaN when absent.");
