//! Workflow store: latest state per (entity, phase) key.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::EngineResult;
use crate::ledger::memory::Availability;

use super::clock::{Clock, SystemClock};
use super::types::{EntityRef, WorkflowEntry, WorkflowKey, WorkflowPatch};

/// Keyed workflow state.
///
/// Implementations must provide at least per-key atomicity for `upsert`;
/// last-write-wins on a single key is acceptable. No history is kept.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get(&self, key: &WorkflowKey) -> EngineResult<Option<WorkflowEntry>>;

    /// Creates the default `todo` entry if absent, merges the fields present
    /// in `patch`, and refreshes `updated_at` (even when nothing changed).
    async fn upsert(&self, key: &WorkflowKey, patch: &WorkflowPatch) -> EngineResult<WorkflowEntry>;
}

/// Workflow store held in memory.
pub struct InMemoryWorkflowStore {
    entries: RwLock<BTreeMap<WorkflowKey, WorkflowEntry>>,
    clock: Arc<dyn Clock>,
    available: Availability,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
            available: Availability::new(),
        }
    }

    /// Copy of every stored entry, for comparisons before and after a call.
    pub async fn snapshot(&self) -> BTreeMap<WorkflowKey, WorkflowEntry> {
        self.entries.read().await.clone()
    }

    /// Stored entries of one entity.
    pub async fn entries_for(&self, entity: &EntityRef) -> Vec<(WorkflowKey, WorkflowEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(k, _)| &k.entity == entity)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get(&self, key: &WorkflowKey) -> EngineResult<Option<WorkflowEntry>> {
        self.available.check("workflow store")?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn upsert(&self, key: &WorkflowKey, patch: &WorkflowPatch) -> EngineResult<WorkflowEntry> {
        self.available.check("workflow store")?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| WorkflowEntry::new(now));
        entry.apply(patch, now);
        Ok(entry.clone())
    }
}
