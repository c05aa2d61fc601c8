use super::traits::{EventStore, StoreError};
use crate::model::{Batch, EventLog};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Transient,
    Rejected,
}

#[derive(Debug, Default)]
struct State {
    logs: HashMap<String, EventLog>,
    pending_faults: Vec<Fault>,
    calls: usize,
}

/// Process-local store. Faults can be scripted to exercise the retry layer.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: Mutex<State>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds or replaces the log of `batch` without going through the trait.
    pub fn insert(&self, batch: &Batch, log: EventLog) {
        self.state().logs.insert(batch.full_id(), log);
    }

    pub fn get(&self, batch: &Batch) -> Option<EventLog> {
        self.state().logs.get(&batch.full_id()).cloned()
    }

    /// Makes the next `count` trait calls fail with `fault`.
    pub fn fail_next(&self, count: usize, fault: Fault) {
        let mut state = self.state();
        state.pending_faults.extend(std::iter::repeat(fault).take(count));
    }

    /// Number of trait calls seen so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    fn begin_call(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.state();
        state.calls += 1;
        if state.pending_faults.is_empty() {
            return Ok(state);
        }
        match state.pending_faults.remove(0) {
            Fault::Transient => Err(StoreError::Transient("injected transient fault".to_string())),
            Fault::Rejected => Err(StoreError::Rejected("injected rejection".to_string())),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn fetch(&self, batch: &Batch) -> Result<EventLog, StoreError> {
        let state = self.begin_call()?;
        state
            .logs
            .get(&batch.full_id())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(batch.full_id()))
    }

    async fn create(&self, batch: &Batch) -> Result<(), StoreError> {
        let mut state = self.begin_call()?;
        state.logs.entry(batch.full_id()).or_default();
        Ok(())
    }

    async fn write_log(&self, batch: &Batch, log: &EventLog) -> Result<(), StoreError> {
        let mut state = self.begin_call()?;
        match state.logs.get_mut(&batch.full_id()) {
            Some(existing) => {
                *existing = log.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(batch.full_id())),
        }
    }
}
