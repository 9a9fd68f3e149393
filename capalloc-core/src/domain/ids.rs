use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a trading-system instance.
///
/// The engine never looks inside a trading system; it only needs a stable key
/// to look up held value in a ledger and to address buy/sell intents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(pub String);

impl SystemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SystemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SystemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
