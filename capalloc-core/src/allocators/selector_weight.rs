//! Selector weight — trust the selector's weights, scaled down when they
//! over-commit capital.

use super::{WeightAllocator, WeightContext};
use crate::domain::{SystemWeight, SystemWeightList};

/// Passes selector weights through. Negative weights become zero; when the
/// weights sum above 1 they are scaled proportionally so they sum to 1.
#[derive(Debug, Clone, Default)]
pub struct SelectorWeight;

impl SelectorWeight {
    pub fn new() -> Self {
        Self
    }
}

impl WeightAllocator for SelectorWeight {
    fn name(&self) -> &str {
        "selector_weight"
    }

    fn compute_weights(
        &mut self,
        _ctx: &WeightContext,
        selected: &[SystemWeight],
    ) -> SystemWeightList {
        let floored: Vec<f64> = selected
            .iter()
            .map(|sw| if sw.weight.is_finite() { sw.weight.max(0.0) } else { 0.0 })
            .collect();
        let sum: f64 = floored.iter().sum();
        let scale = if sum > 1.0 { 1.0 / sum } else { 1.0 };
        selected
            .iter()
            .zip(floored)
            .map(|(sw, w)| SystemWeight::new(sw.system.clone(), w * scale))
            .collect()
    }
}
