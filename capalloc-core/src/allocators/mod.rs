//! Weighting policies — the pluggable hook of the allocation engine.
//!
//! A policy turns the selector's candidate list into the weights the engine
//! allocates against. The engine owns everything else: partitioning,
//! reserve handling, buy sizing and deferred sells.

pub mod equal_weight;
pub mod factory;
pub mod fixed_weight;
pub mod selector_weight;

pub use equal_weight::EqualWeight;
pub use factory::{create_allocator, FactoryError};
pub use fixed_weight::{FixedWeight, FixedWeightList};
pub use selector_weight::SelectorWeight;

use crate::domain::{Query, SystemWeight, SystemWeightList};
use chrono::NaiveDate;

/// What a policy may look at when computing weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightContext {
    pub date: NaiveDate,
    /// Visibility window, already clipped so nothing after `date` shows.
    pub query: Query,
}

/// Clone support for boxed policies. Implemented for every `Clone` policy, so
/// a policy's private run state is copied along with it.
pub trait AllocatorClone {
    fn clone_box(&self) -> Box<dyn WeightAllocator>;
}

impl<T> AllocatorClone for T
where
    T: WeightAllocator + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn WeightAllocator> {
        Box::new(self.clone())
    }
}

/// Trait for weighting policies.
///
/// # Contract
/// - Return one entry per input system, in input order.
/// - Weights are relative proportions of allocatable capital; the engine only
///   bound-checks them when weight validation is switched on.
/// - Any private run state must be cleared in `reset_state`.
pub trait WeightAllocator: AllocatorClone + Send + Sync + std::fmt::Debug {
    /// Human-readable name (e.g., "equal_weight").
    fn name(&self) -> &str;

    fn compute_weights(
        &mut self,
        ctx: &WeightContext,
        selected: &[SystemWeight],
    ) -> SystemWeightList;

    /// Clear private run state between simulation runs.
    fn reset_state(&mut self) {}
}

impl Clone for Box<dyn WeightAllocator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
