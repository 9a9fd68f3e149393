//! Configuration fingerprinting — the persisted surface of an allocation engine.
//!
//! - `ComponentConfig`: a weighting policy type + its parameters.
//! - `EngineConfig`: the four persisted engine fields (name, parameters, query,
//!   reserve percentage). Account handles are runtime wiring and never appear here.
//! - `ConfigHash`: BLAKE3 identity of a configuration, stable across runs.

use crate::allocate::params::{clamp_percent, AllocatorParams};
use crate::domain::Query;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot write TOML config: {0}")]
    Write(#[from] toml::ser::Error),
    #[error("cannot encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Configuration of a weighting policy.
///
/// Uses `BTreeMap` for deterministic key ordering during serialization → hashing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentConfig {
    pub component_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl ComponentConfig {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// 64-hex-digit BLAKE3 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub name: String,
    #[serde(default)]
    pub reserve_percent: f64,
    #[serde(default)]
    pub params: AllocatorParams,
    #[serde(default)]
    pub query: Query,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, params: AllocatorParams) -> Self {
        let reserve_percent = clamp_percent(params.default_reserve_percent);
        Self {
            name: name.into(),
            reserve_percent,
            params,
            query: Query::all(),
        }
    }

    /// Same config with `reserve_percent` forced into `[0, 1]`.
    pub fn normalized(mut self) -> Self {
        self.reserve_percent = clamp_percent(self.reserve_percent);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        Ok(config.normalized())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Exact identity: every persisted field, canonical JSON, BLAKE3.
    pub fn config_hash(&self) -> Result<ConfigHash, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(ConfigHash::from_bytes(json.as_bytes()))
    }

    /// Identity of this engine config combined with its weighting policy.
    pub fn full_hash(&self, allocator: &ComponentConfig) -> Result<ConfigHash, ConfigError> {
        let json = serde_json::to_string(&(self, allocator))?;
        Ok(ConfigHash::from_bytes(json.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_config() -> EngineConfig {
        let mut config = EngineConfig::new(
            "core",
            AllocatorParams {
                default_reserve_percent: 0.1,
                ..AllocatorParams::default()
            },
        );
        config.query = Query::between(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        config
    }

    #[test]
    fn new_takes_reserve_from_default_param() {
        assert_eq!(sample_config().reserve_percent, 0.1);
    }

    #[test]
    fn hashing_is_deterministic() {
        let config = sample_config();
        assert_eq!(config.config_hash().unwrap(), config.config_hash().unwrap());
        assert_eq!(config.config_hash().unwrap().0.len(), 64);
    }

    #[test]
    fn hash_changes_with_reserve() {
        let c1 = sample_config();
        let mut c2 = sample_config();
        c2.reserve_percent = 0.2;
        assert_ne!(c1.config_hash().unwrap(), c2.config_hash().unwrap());
    }

    #[test]
    fn full_hash_differs_for_different_policy() {
        let config = sample_config();
        let equal = ComponentConfig::new("equal_weight");
        let fixed = ComponentConfig::new("fixed_weight").with_param("weight", 0.2);
        assert_ne!(
            config.full_hash(&equal).unwrap(),
            config.full_hash(&fixed).unwrap()
        );
    }

    #[test]
    fn toml_roundtrip_preserves_config() {
        let config = sample_config();
        let text = config.to_toml_string().unwrap();
        let loaded = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, loaded);
        assert_eq!(config.config_hash().unwrap(), loaded.config_hash().unwrap());
    }

    #[test]
    fn loading_clamps_reserve() {
        let config = EngineConfig::from_toml_str("name = \"x\"\nreserve_percent = 3.0\n").unwrap();
        assert_eq!(config.reserve_percent, 1.0);
        assert_eq!(config.params, AllocatorParams::default());
        assert_eq!(config.query, Query::all());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("name = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
