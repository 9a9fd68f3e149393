//! Scenario files — one rebalance date worth of inputs, as TOML.
//!
//! ```toml
//! date = "2024-06-03"
//! running = ["trend"]
//!
//! [engine]
//! name = "core"
//! reserve_percent = 0.1
//!
//! [allocator]
//! component_type = "equal_weight"
//!
//! [account]
//! opened = "2024-01-02"
//! cash = 50000.0
//! holdings = { trend = 50000.0 }
//!
//! [[selected]]
//! system = "trend"
//! weight = 0.5
//! ```

use anyhow::{Context, Result};
use capalloc_core::account::{shared, Account};
use capalloc_core::allocators::create_allocator;
use capalloc_core::{AllocationEngine, ComponentConfig, EngineConfig, SystemId, SystemWeight};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Starting state of the portfolio's account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountConfig {
    #[serde(default = "default_account_name")]
    pub name: String,
    pub opened: NaiveDate,
    pub cash: f64,
    /// Held value per running system.
    #[serde(default)]
    pub holdings: BTreeMap<String, f64>,
}

fn default_account_name() -> String {
    "portfolio".to_string()
}

impl AccountConfig {
    pub fn build(&self) -> Account {
        self.holdings.iter().fold(
            Account::new(self.name.clone(), self.opened, self.cash),
            |account, (system, value)| account.with_holding(system.as_str(), *value),
        )
    }
}

/// Everything needed to run one allocation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub date: NaiveDate,
    #[serde(default)]
    pub running: Vec<SystemId>,
    pub engine: EngineConfig,
    pub allocator: ComponentConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub selected: Vec<SystemWeight>,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut scenario: Self = toml::from_str(text).context("invalid scenario TOML")?;
        scenario.engine = scenario.engine.normalized();
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read scenario {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn running_set(&self) -> HashSet<SystemId> {
        self.running.iter().cloned().collect()
    }

    /// A configured engine with no accounts attached.
    pub fn detached_engine(&self) -> Result<AllocationEngine> {
        let allocator = create_allocator(&self.allocator)?;
        Ok(AllocationEngine::from_config(self.engine.clone(), allocator))
    }

    /// Attach a fresh live/shadow pair built from the account section.
    pub fn attach_accounts(&self, engine: &mut AllocationEngine) {
        let account = self.account.build();
        engine.attach_accounts(shared(account.clone()), shared(account));
    }

    pub fn engine(&self) -> Result<AllocationEngine> {
        let mut engine = self.detached_engine()?;
        self.attach_accounts(&mut engine);
        Ok(engine)
    }
}
