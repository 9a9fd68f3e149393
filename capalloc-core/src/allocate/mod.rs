//! Allocation engine — decides how much of the shared pool each candidate
//! trading system receives at a rebalance date.
//!
//! One pass (`AllocationEngine::adjust_funds`):
//! 1. The weighting policy turns the selector's candidates into weights
//! 2. Optional bound check of every weight against `[0, 1]`
//! 3. Partition into reconcile / fresh / untouched by set membership
//! 4. Buys sized against the shadow ledger's spendable cash; sells deferred

pub mod engine;
pub mod error;
pub mod intent;
pub mod params;
pub mod partition;

pub use engine::AllocationEngine;
pub use error::{AccountRole, AllocateError};
pub use intent::{AllocationPath, BuyIntent, FundsAdjustment};
pub use params::{clamp_percent, AllocatorParams, SellUnit};
pub use partition::{partition, Partition};
