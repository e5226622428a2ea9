use chrono::{DateTime, Utc};

use crate::domain::entities::record::{Record, RecordId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("note #{note} not found on record {record}")]
    NoteNotFound { record: RecordId, note: u64 },
    #[error("duplicate record id {0}")]
    DuplicateId(RecordId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Ordered, in-memory record list for one page. Writes are serialized;
/// reads hand out copies.
pub trait RecordStore<R: Record>: Send + Sync {
    /// Loads records as-is. Ids must be unique; the id counter moves past the
    /// highest one.
    fn seed(&self, records: Vec<R>) -> Result<(), StoreError>;

    fn create(&self, draft: R::Draft, now: DateTime<Utc>) -> Result<R, StoreError>;

    fn update(&self, id: RecordId, patch: R::Patch, now: DateTime<Utc>) -> Result<R, StoreError>;

    fn remove(&self, id: RecordId) -> Result<R, StoreError>;

    fn get(&self, id: RecordId) -> Option<R>;

    fn list(&self) -> Vec<R>;

    /// Commits a bulk outcome. Never moves the id counter backwards.
    fn replace_all(&self, records: Vec<R>) -> Result<(), StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
