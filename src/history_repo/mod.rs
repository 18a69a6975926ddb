// In-memory latency history: one bounded buffer per target, nothing persisted.
// All buffers of a cycle are written under one write lock, and the frame for that cycle is
// taken under the same lock, so readers never see a half-applied cycle.

mod buffer;

pub use buffer::{HISTORY_CAPACITY, MetricsBuffer};

use crate::models::{Frame, Sample, TargetStats};
use crate::registry::TargetRegistry;
use crate::snapshot;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::instrument;

#[derive(Debug, Default)]
pub struct HistoryRepo {
    buffers: RwLock<HashMap<String, MetricsBuffer>>,
}

impl HistoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every outcome of a settled cycle, then projects the registry into the cycle's frame.
    /// The registry is read under the history write lock: an outcome for an address removed
    /// while its probe was in flight is dropped instead of resurrecting its buffer.
    #[instrument(skip_all, fields(repo = "history", operation = "record_cycle", cycle = cycle))]
    pub fn record_cycle(
        &self,
        cycle: u64,
        registry: &TargetRegistry,
        outcomes: Vec<(String, Sample)>,
    ) -> Frame {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        let targets = registry.list();
        let mut dropped = 0usize;
        for (address, sample) in outcomes {
            if targets.iter().any(|t| t.address == address) {
                buffers.entry(address).or_default().record(sample);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "outcomes for unregistered targets discarded");
        }
        snapshot::snapshot(cycle, &targets, &buffers)
    }

    pub fn stats(&self, address: &str) -> Option<TargetStats> {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        buffers.get(address).map(MetricsBuffer::stats)
    }

    /// Buffered samples for one target, oldest first.
    pub fn samples(&self, address: &str) -> Vec<Sample> {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        buffers
            .get(address)
            .map(|b| b.samples().copied().collect())
            .unwrap_or_default()
    }

    /// Drops history for every address the registry no longer holds.
    pub fn retain_registered(&self, registry: &TargetRegistry) {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        let keep = registry.list();
        buffers.retain(|address, _| keep.iter().any(|t| &t.address == address));
    }

    pub fn remove(&self, address: &str) -> bool {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        buffers.remove(address).is_some()
    }
}
