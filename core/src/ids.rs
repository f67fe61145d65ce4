//! Opaque identifiers used throughout the trading core.
//!
//! `SystemOrderId` and `FillId` are minted locally (128-bit, collision-free
//! without coordination); `BrokerOrderId` is assigned by whichever broker
//! accepted the order and is `None` for the simulated broker, which never
//! hands out its own identifier.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Strategy-minted identifier for a submitted order.
///
/// Generated at submission time by the strategy runtime; stable for the
/// lifetime of the order across accept/reject/fill/cancel/modify.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Display)]
pub struct SystemOrderId(Uuid);

impl SystemOrderId {
    /// Mint a fresh, random order id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SystemOrderId {
    fn default() -> Self {
        Self::new()
    }
}

/// Broker-assigned identifier for an accepted order.
///
/// Opaque to the core; the simulated broker never assigns one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct BrokerOrderId(String);

impl BrokerOrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrokerOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broker-minted identifier for a completed fill.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Display)]
pub struct FillId(Uuid);

impl FillId {
    /// Mint a fresh, random fill id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FillId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier unique to one orchestrator invocation.
///
/// Formatted as `"{utc timestamp}_{strategy names}"`, matching the
/// original `Orchestrator._generate_run_id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Display)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_order_ids_are_unique() {
        assert_ne!(SystemOrderId::new(), SystemOrderId::new());
    }

    #[test]
    fn broker_order_id_displays_inner_string() {
        let id = BrokerOrderId::new("BROKER123");
        assert_eq!(id.to_string(), "BROKER123");
        assert_eq!(id.as_str(), "BROKER123");
    }

    #[test]
    fn run_id_roundtrips_string() {
        let id = RunId::new("2026-07-26_00-00-00_SMACrossover");
        assert_eq!(id.as_str(), "2026-07-26_00-00-00_SMACrossover");
    }
}
