//! Factory — converts a `ComponentConfig` into a boxed weighting policy.

use crate::fingerprint::ComponentConfig;

use super::{EqualWeight, FixedWeight, FixedWeightList, SelectorWeight, WeightAllocator};

/// Errors that can occur during policy construction.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("Unknown weighting policy: {0}")]
    UnknownAllocator(String),
    #[error("Invalid parameter '{name}' for {component}: {reason}")]
    InvalidParam {
        component: String,
        name: String,
        reason: String,
    },
}

/// Extract a named f64 parameter from a `ComponentConfig`, falling back to `default`.
fn param(config: &ComponentConfig, name: &str, default: f64) -> f64 {
    config.params.get(name).copied().unwrap_or(default)
}

/// Collect `w0`, `w1`, ... in index order. Indices must be contiguous from 0.
fn indexed_weights(config: &ComponentConfig) -> Result<Vec<f64>, FactoryError> {
    let mut indexed = Vec::with_capacity(config.params.len());
    for (name, value) in &config.params {
        let index = name
            .strip_prefix('w')
            .and_then(|i| i.parse::<usize>().ok())
            .ok_or_else(|| FactoryError::InvalidParam {
                component: config.component_type.clone(),
                name: name.clone(),
                reason: "expected w<index>".into(),
            })?;
        indexed.push((index, *value));
    }
    indexed.sort_by_key(|(i, _)| *i);
    for (expected, (index, _)) in indexed.iter().enumerate() {
        if *index != expected {
            return Err(FactoryError::InvalidParam {
                component: config.component_type.clone(),
                name: format!("w{expected}"),
                reason: "missing weight index".into(),
            });
        }
    }
    Ok(indexed.into_iter().map(|(_, w)| w).collect())
}

/// Create a weighting policy from a `ComponentConfig`.
pub fn create_allocator(
    config: &ComponentConfig,
) -> Result<Box<dyn WeightAllocator>, FactoryError> {
    match config.component_type.as_str() {
        "equal_weight" => Ok(Box::new(EqualWeight::new())),
        "fixed_weight" => {
            let weight = param(config, "weight", 0.1);
            Ok(Box::new(FixedWeight::new(weight)))
        }
        "fixed_weight_list" => Ok(Box::new(FixedWeightList::new(indexed_weights(config)?))),
        "selector_weight" => Ok(Box::new(SelectorWeight::new())),
        other => Err(FactoryError::UnknownAllocator(other.to_string())),
    }
}
