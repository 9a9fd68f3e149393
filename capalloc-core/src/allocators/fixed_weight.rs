//! Fixed weights — a constant per system, or a per-position list.

use super::{WeightAllocator, WeightContext};
use crate::domain::{SystemWeight, SystemWeightList};

/// Every selected system receives the same configured weight.
#[derive(Debug, Clone)]
pub struct FixedWeight {
    weight: f64,
}

impl FixedWeight {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl Default for FixedWeight {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl WeightAllocator for FixedWeight {
    fn name(&self) -> &str {
        "fixed_weight"
    }

    fn compute_weights(
        &mut self,
        _ctx: &WeightContext,
        selected: &[SystemWeight],
    ) -> SystemWeightList {
        selected
            .iter()
            .map(|sw| SystemWeight::new(sw.system.clone(), self.weight))
            .collect()
    }
}

/// The i-th selected system receives `weights[i]`; systems past the end of
/// the list receive zero.
#[derive(Debug, Clone, Default)]
pub struct FixedWeightList {
    weights: Vec<f64>,
}

impl FixedWeightList {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl WeightAllocator for FixedWeightList {
    fn name(&self) -> &str {
        "fixed_weight_list"
    }

    fn compute_weights(
        &mut self,
        _ctx: &WeightContext,
        selected: &[SystemWeight],
    ) -> SystemWeightList {
        selected
            .iter()
            .enumerate()
            .map(|(i, sw)| {
                let weight = self.weights.get(i).copied().unwrap_or(0.0);
                SystemWeight::new(sw.system.clone(), weight)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Query;
    use chrono::NaiveDate;

    fn ctx() -> WeightContext {
        WeightContext {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            query: Query::all(),
        }
    }

    fn selected(n: usize) -> Vec<SystemWeight> {
        (0..n).map(|i| SystemWeight::new(format!("s{i}"), 1.0)).collect()
    }

    #[test]
    fn fixed_weight_defaults_to_ten_percent() {
        let weights = FixedWeight::default().compute_weights(&ctx(), &selected(3));
        assert_eq!(weights.len(), 3);
        assert!(weights.iter().all(|w| w.weight == 0.1));
    }

    #[test]
    fn fixed_weight_list_pads_with_zero() {
        let mut policy = FixedWeightList::new(vec![0.5, 0.3]);
        let weights = policy.compute_weights(&ctx(), &selected(3));
        let values: Vec<f64> = weights.iter().map(|w| w.weight).collect();
        assert_eq!(values, vec![0.5, 0.3, 0.0]);
    }

    #[test]
    fn fixed_weight_list_ignores_surplus_weights() {
        let mut policy = FixedWeightList::new(vec![0.5, 0.3, 0.2]);
        assert_eq!(policy.compute_weights(&ctx(), &selected(1)).len(), 1);
    }
}
