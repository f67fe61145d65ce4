//! Shared closed-set enumerations.
//!
//! These are the types every crate in the workspace imports rather than
//! redefining: the bar granularity, order shape, trade direction,
//! advisory action metadata, and the three independent rejection-reason
//! enums.

use serde::{Deserialize, Serialize};

/// Bar aggregation period.
///
/// Mirrors the vendor `rtype` encoding used by the catalog: 32=SECOND,
/// 33=MINUTE, 34=HOUR, 35=DAY.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum BarPeriod {
    Second,
    Minute,
    Hour,
    Day,
}

impl BarPeriod {
    /// Vendor-specific numeric code used by the catalog's `ohlcv.rtype` column.
    pub fn rtype(self) -> i64 {
        match self {
            BarPeriod::Second => 32,
            BarPeriod::Minute => 33,
            BarPeriod::Hour => 34,
            BarPeriod::Day => 35,
        }
    }

    /// Inverse of [`BarPeriod::rtype`]. Returns `None` for unknown codes.
    pub fn from_rtype(rtype: i64) -> Option<Self> {
        match rtype {
            32 => Some(BarPeriod::Second),
            33 => Some(BarPeriod::Minute),
            34 => Some(BarPeriod::Hour),
            35 => Some(BarPeriod::Day),
            _ => None,
        }
    }
}

/// Execution constraint of an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

/// Direction of a trade.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Advisory intent of an order from the strategy's perspective.
///
/// Purely metadata for the recorder; the broker never inspects it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum ActionType {
    Entry,
    EntryLong,
    EntryShort,
    Exit,
    ExitLong,
    ExitShort,
    Add,
    Reduce,
    Reverse,
}

/// Reason an `OrderSubmissionRequest` was rejected.
///
/// Currently has a single member upstream of this fork; kept as its own
/// enum (rather than folded into the other two rejection enums) because
/// submission, cancellation, and modification reasons grow independently
/// as call sites are added.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[non_exhaustive]
pub enum OrderRejectionReason {
    Unknown,
}

/// Reason an `OrderCancellationRequest` was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[non_exhaustive]
pub enum CancellationRejectionReason {
    Unknown,
}

/// Reason an `OrderModificationRequest` was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[non_exhaustive]
pub enum ModificationRejectionReason {
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_period_rtype_roundtrips() {
        for period in [BarPeriod::Second, BarPeriod::Minute, BarPeriod::Hour, BarPeriod::Day] {
            assert_eq!(BarPeriod::from_rtype(period.rtype()), Some(period));
        }
    }

    #[test]
    fn unknown_rtype_is_none() {
        assert_eq!(BarPeriod::from_rtype(99), None);
    }
}
