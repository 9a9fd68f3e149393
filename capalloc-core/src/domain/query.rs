//! Query — the date window an allocation round is allowed to see.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date window. `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Query {
    /// Unbounded window.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// The window clipped so that nothing after `date` is visible.
    pub fn visible_until(&self, date: NaiveDate) -> Self {
        let end = match self.end {
            Some(e) if e < date => e,
            _ => date,
        };
        Self {
            start: self.start,
            end: Some(end),
        }
    }
}
