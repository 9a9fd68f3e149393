//! Allocation intents — what an allocation pass asks the portfolio to do.
//!
//! The engine emits intents, never fills. Buys are safe to execute right away;
//! deferred sells must be executed (and settled) by the portfolio controller
//! before the freed cash can fund anything else.

use crate::domain::{SystemId, SystemWeightList};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which partition a selected system fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPath {
    /// Selected and already running: reconcile toward the target value.
    Reconcile,
    /// Selected but not running: fresh allocation.
    Fresh,
}

/// Request to move `amount` of capital into a system now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyIntent {
    pub system: SystemId,
    pub amount: f64,
    pub path: AllocationPath,
}

/// Outcome of one `adjust_funds` pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsAdjustment {
    pub date: NaiveDate,
    /// Live account total assets at `date`.
    pub total_assets: f64,
    /// Assets held back from allocation this round.
    pub reserve: f64,
    /// `total_assets - reserve`; targets are `weight * allocatable`.
    pub allocatable: f64,
    /// Immediate buys, in weighted-list order.
    pub buys: Vec<BuyIntent>,
    /// Sells the portfolio must execute before reinvesting, in weighted-list
    /// order. Each weight holds the excess in the engine's sell unit.
    pub deferred_sells: SystemWeightList,
    /// Running systems that were not selected, plus selected systems the
    /// policy returned no weight for. Left alone by this pass.
    pub untouched: Vec<SystemId>,
}

impl FundsAdjustment {
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.deferred_sells.is_empty()
    }

    pub fn total_bought(&self) -> f64 {
        self.buys.iter().map(|b| b.amount).sum()
    }

    pub fn buy_for(&self, system: &SystemId) -> Option<&BuyIntent> {
        self.buys.iter().find(|b| &b.system == system)
    }
}
