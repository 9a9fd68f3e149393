//! Partitioning of selected and running systems.
//!
//! Every system in `selected ∪ running` lands in exactly one group, decided by
//! set membership alone:
//! - selected ∩ running → reconcile
//! - selected ∖ running → fresh allocation
//! - running ∖ selected → untouched
//!
//! A selected system the weighting policy returns no weight for is also
//! untouched: the pass has nothing to do for it.

use super::intent::AllocationPath;
use crate::domain::{SystemId, SystemWeight};
use std::collections::HashSet;
use tracing::warn;

/// Result of partitioning a weighted list against the running set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    /// Selected systems in weighted-list order, tagged with their path.
    pub selected: Vec<(SystemWeight, AllocationPath)>,
    /// Running systems absent from the weighted list, plus selected systems the
    /// policy dropped. Sorted.
    pub untouched: Vec<SystemId>,
}

impl Partition {
    pub fn reconcile(&self) -> impl Iterator<Item = &SystemWeight> {
        self.with_path(AllocationPath::Reconcile)
    }

    pub fn fresh(&self) -> impl Iterator<Item = &SystemWeight> {
        self.with_path(AllocationPath::Fresh)
    }

    fn with_path(&self, path: AllocationPath) -> impl Iterator<Item = &SystemWeight> {
        self.selected
            .iter()
            .filter(move |(_, p)| *p == path)
            .map(|(sw, _)| sw)
    }

    /// Move selected systems missing from the policy's output into `untouched`.
    pub fn absorb_dropped(&mut self, selected: &[SystemWeight]) {
        let mut added = false;
        for sw in selected {
            let known = self.path_of(&sw.system).is_some() || self.untouched.contains(&sw.system);
            if !known {
                warn!(system = %sw.system, "policy returned no weight for selected system");
                self.untouched.push(sw.system.clone());
                added = true;
            }
        }
        if added {
            self.untouched.sort();
        }
    }

    /// Path of a system, or `None` when it is untouched or unknown.
    pub fn path_of(&self, system: &SystemId) -> Option<AllocationPath> {
        self.selected
            .iter()
            .find(|(sw, _)| &sw.system == system)
            .map(|(_, p)| *p)
    }
}

/// Split `weighted` and `running` into the three disjoint groups.
///
/// A system listed more than once keeps its first occurrence.
pub fn partition(weighted: &[SystemWeight], running: &HashSet<SystemId>) -> Partition {
    let mut seen: HashSet<&SystemId> = HashSet::with_capacity(weighted.len());
    let mut selected = Vec::with_capacity(weighted.len());

    for sw in weighted {
        if !seen.insert(&sw.system) {
            warn!(
                system = %sw.system,
                weight = sw.weight,
                "duplicate system in weight list ignored"
            );
            continue;
        }
        let path = if running.contains(&sw.system) {
            AllocationPath::Reconcile
        } else {
            AllocationPath::Fresh
        };
        selected.push((sw.clone(), path));
    }

    let mut untouched: Vec<SystemId> = running
        .iter()
        .filter(|id| !seen.contains(id))
        .cloned()
        .collect();
    untouched.sort();

    Partition { selected, untouched }
}
