// Target registry: the single source of truth for which addresses are monitored.
// Cycles read a copy of the list at cycle start, so writes never race an in-flight cycle.

use crate::models::{Target, TargetMetadata};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: RwLock<Vec<Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a target. Returns false (and leaves the registry untouched) if the address is already present.
    pub fn add(&self, address: impl Into<String>, metadata: TargetMetadata) -> bool {
        let address = address.into();
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        if targets.iter().any(|t| t.address == address) {
            return false;
        }
        tracing::debug!(operation = "add_target", address = %address, "target added");
        targets.push(Target::new(address, metadata));
        true
    }

    pub fn remove(&self, address: &str) -> bool {
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        let before = targets.len();
        targets.retain(|t| t.address != address);
        let removed = targets.len() != before;
        if removed {
            tracing::debug!(operation = "remove_target", address = %address, "target removed");
        }
        removed
    }

    /// Copy of the current targets in insertion order.
    pub fn list(&self) -> Vec<Target> {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swaps in a whole new target set; later duplicates of an address are dropped.
    /// Returns the addresses that were monitored before and are not anymore.
    pub fn replace(&self, next: Vec<Target>) -> Vec<String> {
        let mut deduped: Vec<Target> = Vec::with_capacity(next.len());
        for t in next {
            if !deduped.iter().any(|d| d.address == t.address) {
                deduped.push(t);
            }
        }
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = targets
            .iter()
            .filter(|old| !deduped.iter().any(|t| t.address == old.address))
            .map(|old| old.address.clone())
            .collect();
        tracing::debug!(operation = "replace_targets", targets = deduped.len(), "target set replaced");
        *targets = deduped;
        dropped
    }
}
