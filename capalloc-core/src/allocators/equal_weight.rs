//! Equal weight — every selected system receives `1 / n`.

use super::{WeightAllocator, WeightContext};
use crate::domain::{SystemWeight, SystemWeightList};

#[derive(Debug, Clone, Default)]
pub struct EqualWeight;

impl EqualWeight {
    pub fn new() -> Self {
        Self
    }
}

impl WeightAllocator for EqualWeight {
    fn name(&self) -> &str {
        "equal_weight"
    }

    fn compute_weights(
        &mut self,
        _ctx: &WeightContext,
        selected: &[SystemWeight],
    ) -> SystemWeightList {
        if selected.is_empty() {
            return Vec::new();
        }
        let weight = 1.0 / selected.len() as f64;
        selected
            .iter()
            .map(|sw| SystemWeight::new(sw.system.clone(), weight))
            .collect()
    }
}
