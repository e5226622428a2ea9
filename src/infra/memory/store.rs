use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::entities::record::{PatchError, Record, RecordId, Validate};
use crate::usecase::ports::repo::{RecordStore, StoreError};

struct StoreState<R> {
    records: Vec<R>,
    next_id: u64,
}

pub struct InMemoryStore<R> {
    state: RwLock<StoreState<R>>,
}

impl<R: Record> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                records: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub fn with_records(records: Vec<R>) -> Result<Self, StoreError> {
        let store = Self::new();
        store.seed(records)?;
        Ok(store)
    }

    /// Id the next `create` will assign.
    pub fn next_id(&self) -> RecordId {
        RecordId(self.state.read().next_id)
    }

    fn install(&self, records: Vec<R>) -> Result<(), StoreError> {
        let mut seen = BTreeSet::new();
        for record in &records {
            if !seen.insert(record.id()) {
                return Err(StoreError::DuplicateId(record.id()));
            }
        }

        let mut state = self.state.write();
        let floor = seen.last().map_or(1, |max| max.0 + 1);
        state.next_id = state.next_id.max(floor);
        state.records = records;
        Ok(())
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordStore<R> for InMemoryStore<R> {
    fn seed(&self, records: Vec<R>) -> Result<(), StoreError> {
        let count = records.len();
        self.install(records)?;
        info!(kind = R::schema().kind, count, "store seeded");
        Ok(())
    }

    fn create(&self, draft: R::Draft, now: DateTime<Utc>) -> Result<R, StoreError> {
        draft.validate()?;

        let mut state = self.state.write();
        let id = RecordId(state.next_id);
        state.next_id += 1;
        let record = R::from_draft(id, draft, now);
        state.records.push(record.clone());
        Ok(record)
    }

    fn update(&self, id: RecordId, patch: R::Patch, now: DateTime<Utc>) -> Result<R, StoreError> {
        let mut state = self.state.write();
        let slot = state
            .records
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut updated = slot.clone();
        updated.apply_patch(patch, now).map_err(|err| match err {
            PatchError::NoteNotFound(note) => StoreError::NoteNotFound { record: id, note },
        })?;
        updated.validate()?;

        *slot = updated.clone();
        Ok(updated)
    }

    fn remove(&self, id: RecordId) -> Result<R, StoreError> {
        let mut state = self.state.write();
        let index = state
            .records
            .iter()
            .position(|record| record.id() == id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(state.records.remove(index))
    }

    fn get(&self, id: RecordId) -> Option<R> {
        self.state
            .read()
            .records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    fn list(&self) -> Vec<R> {
        self.state.read().records.clone()
    }

    fn replace_all(&self, records: Vec<R>) -> Result<(), StoreError> {
        let count = records.len();
        self.install(records)?;
        debug!(kind = R::schema().kind, count, "store replaced");
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.read().records.len()
    }
}
