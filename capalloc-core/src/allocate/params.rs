//! Engine parameters — the configurable surface of an allocation engine.

use serde::{Deserialize, Serialize};

/// Unit in which deferred-sell excess is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellUnit {
    /// Currency amount: `current - target`.
    #[default]
    Value,
    /// Share of the system's current holding to sell: `(current - target) / current`.
    Fraction,
}

/// Parameters of an allocation engine. Every field has a default so partial
/// TOML tables load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorParams {
    /// Reserve percentage restored by `reset()`. Clamped to `[0, 1]` on use.
    pub default_reserve_percent: f64,
    /// Bound-check every policy weight against `[0, 1]`. Off by default.
    pub validate_weights: bool,
    /// Reconcile systems that are both selected and running. When off they are
    /// left untouched and only fresh allocations happen.
    pub adjust_running: bool,
    /// Fresh systems weighted below this get no buy.
    pub weight_unit: f64,
    /// Cap on systems holding an allocation after a pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_systems: Option<usize>,
    pub sell_unit: SellUnit,
}

impl Default for AllocatorParams {
    fn default() -> Self {
        Self {
            default_reserve_percent: 0.0,
            validate_weights: false,
            adjust_running: true,
            weight_unit: 0.0001,
            max_systems: None,
            sell_unit: SellUnit::Value,
        }
    }
}

/// Clamp a reserve percentage into `[0, 1]`. NaN maps to zero.
pub fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
