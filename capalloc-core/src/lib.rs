//! Capalloc Core — capital allocation across a portfolio of trading systems.
//!
//! This crate contains:
//! - Domain types (system handles, weights, query windows)
//! - The account ledger used for both the live and the shadow account
//! - The allocation engine: partitioning, reserve carve-out, buy sizing, deferred sells
//! - Weighting policies behind the `WeightAllocator` trait, plus a factory
//! - Configuration persistence and fingerprinting

pub mod account;
pub mod allocate;
pub mod allocators;
pub mod domain;
pub mod fingerprint;

pub use account::{Account, AccountError, SharedAccount};
pub use allocate::{AllocateError, AllocationEngine, AllocatorParams, FundsAdjustment};
pub use allocators::WeightAllocator;
pub use domain::{Query, SystemId, SystemWeight, SystemWeightList};
pub use fingerprint::{ComponentConfig, EngineConfig};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a portfolio moves across threads is Send + Sync.
    ///
    /// Independent portfolios run their cloned engines in parallel; if any type
    /// fails this check, the build breaks immediately.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<AllocationEngine>();
        require_sync::<AllocationEngine>();
        require_send::<Account>();
        require_sync::<Account>();
        require_send::<SharedAccount>();
        require_sync::<SharedAccount>();
        require_send::<FundsAdjustment>();
        require_sync::<FundsAdjustment>();
        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<Box<dyn WeightAllocator>>();
        require_sync::<Box<dyn WeightAllocator>>();
    }

    /// Architecture contract: weighting policies cannot see accounts.
    ///
    /// `compute_weights` takes a `WeightContext` (date + clipped query) and the
    /// candidate list, nothing else. Adding a ledger parameter changes the trait
    /// and breaks every policy.
    #[test]
    fn weight_allocator_has_no_account_parameter() {
        fn _check_trait_object_builds(
            policy: &mut dyn WeightAllocator,
            ctx: &allocators::WeightContext,
            selected: &[SystemWeight],
        ) -> SystemWeightList {
            policy.compute_weights(ctx, selected)
        }
    }
}
