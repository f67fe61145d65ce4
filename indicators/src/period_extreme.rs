//! Rolling minimum/maximum over another indicator's output.

use crate::indicator::{HistoryBuffer, Indicator};
use crate::plot::{ExtremeType, PlotColor, PlotStyle};
use tidemark_core::events::BarReceived;

/// Minimum or maximum of `source`'s last `period` values.
///
/// `source` is updated once per incoming bar before this indicator reads
/// it, so both share the same bar stream. Reports `NaN` until `source`
/// has `period` consecutive non-`NaN` values.
#[derive(Debug)]
pub struct PeriodExtreme {
    source: Box<dyn Indicator>,
    period: usize,
    extreme_type: ExtremeType,
    plot_at: u8,
    plot_style: PlotStyle,
    plot_color: PlotColor,
    history: HistoryBuffer,
}

impl PeriodExtreme {
    pub fn new(
        source: Box<dyn Indicator>,
        period: usize,
        extreme_type: ExtremeType,
        max_history: usize,
        plot_at: u8,
        plot_style: PlotStyle,
        plot_color: PlotColor,
    ) -> Self {
        Self {
            source,
            period: period.max(1),
            extreme_type,
            plot_at,
            plot_style,
            plot_color,
            history: HistoryBuffer::new(max_history),
        }
    }
}

impl Indicator for PeriodExtreme {
    fn name(&self) -> String {
        format!("{}-period {} of {}", self.period, self.extreme_type, self.source.name())
    }

    fn update(&self, bar: &BarReceived) {
        self.source.update(bar);
        let symbol = &bar.symbol;

        let mut values = Vec::with_capacity(self.period);
        let mut incomplete = false;
        for i in -(self.period as i64)..0 {
            let value = self.source.get(symbol, i);
            if value.is_nan() {
                incomplete = true;
                break;
            }
            values.push(value);
        }

        let computed = if incomplete {
            f64::NAN
        } else {
            match self.extreme_type {
                ExtremeType::Min => values.into_iter().fold(f64::INFINITY, f64::min),
                ExtremeType::Max => values.into_iter().fold(f64::NEG_INFINITY, f64::max),
            }
        };
        self.history.push(symbol, computed);
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
        self.plot_at
    }

    fn plot_style(&self) -> PlotStyle {
        self.plot_style
    }

    fn plot_color(&self) -> PlotColor {
        self.plot_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::{BarField, Close};
    use tidemark_core::model::BarPeriod;

    fn bar(close: f64) -> BarReceived {
        BarReceived {
            ts_event_ns: 0,
            ts_created_ns: 0,
            symbol: "AAPL".into(),
            bar_period: BarPeriod::Minute,
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(1),
        }
    }

    fn make(period: usize, extreme_type: ExtremeType) -> PeriodExtreme {
        PeriodExtreme::new(
            Box::new(Close::new(period.max(1))),
            period,
            extreme_type,
            100,
            0,
            PlotStyle::Line,
            PlotColor::Black,
        )
    }

    #[test]
    fn reports_nan_until_window_is_full() {
        let extreme = make(3, ExtremeType::Max);
        extreme.update(&bar(1.0));
        assert!(extreme.latest("AAPL").is_nan());
        extreme.update(&bar(2.0));
        assert!(extreme.latest("AAPL").is_nan());
        extreme.update(&bar(3.0));
        assert_eq!(extreme.latest("AAPL"), 3.0);
    }

    #[test]
    fn computes_rolling_max() {
        let extreme = make(3, ExtremeType::Max);
        for close in [5.0, 2.0, 8.0, 1.0] {
            extreme.update(&bar(close));
        }
        assert_eq!(extreme.latest("AAPL"), 8.0);
    }

    #[test]
    fn computes_rolling_min() {
        let extreme = make(3, ExtremeType::Min);
        for close in [5.0, 2.0, 8.0, 1.0] {
            extreme.update(&bar(close));
        }
        assert_eq!(extreme.latest("AAPL"), 1.0);
    }

    #[test]
    fn name_combines_period_extreme_type_and_source() {
        let extreme = make(20, ExtremeType::Max);
        assert_eq!(extreme.name(), format!("20-period MAX of {}", BarField::Close.label()));
    }
}
