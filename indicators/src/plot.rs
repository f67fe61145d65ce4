//! Inert metadata forwarded to the recorder for charting. None of these
//! values affect computation; they only describe how a value should be
//! drawn once recorded.

use serde::{Deserialize, Serialize};

/// Visual style used to render an indicator's series.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum PlotStyle {
    Line,
    Histogram,
    Dots,
    Dash1,
    Dash2,
    Dash3,
}

/// Color used to render an indicator's series.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum PlotColor {
    Black,
    Red,
    Blue,
    Green,
    Orange,
    Purple,
    Cyan,
    Magenta,
    Yellow,
    White,
    Teal,
}

/// Which extreme [`crate::period_extreme::PeriodExtreme`] computes over its window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum ExtremeType {
    Min,
    Max,
}

impl std::fmt::Display for ExtremeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtremeType::Min => write!(f, "MIN"),
            ExtremeType::Max => write!(f, "MAX"),
        }
    }
}
