//! SystemWeight — a trading system paired with its relative allocation.

use super::ids::SystemId;
use serde::{Deserialize, Serialize};

/// A trading system and its relative allocation proportion.
///
/// The weight is not normalized by the engine; normalization belongs to the
/// weighting policy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemWeight {
    pub system: SystemId,
    pub weight: f64,
}

impl SystemWeight {
    pub fn new(system: impl Into<SystemId>, weight: f64) -> Self {
        Self {
            system: system.into(),
            weight,
        }
    }
}

/// Ordered list of system weights. Order is significant: it is the tie-break
/// when capital runs out and the order deferred sells are reported in.
pub type SystemWeightList = Vec<SystemWeight>;

/// Sum of all weights in a list.
pub fn total_weight(list: &[SystemWeight]) -> f64 {
    list.iter().map(|sw| sw.weight).sum()
}
