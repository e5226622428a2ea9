use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::domain::entities::edit::BulkOp;
use crate::domain::entities::record::{Record, RecordId};
use crate::usecase::pipeline::bulk::{self, BulkError, BulkOutcome};
use crate::usecase::ports::repo::{RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Bulk(#[from] BulkError),
}

/// Write side of a record kind. Every change goes through here so bulk
/// read-modify-write cycles cannot interleave with single edits.
pub struct EditService<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    write_lock: Mutex<()>,
}

impl<R: Record> EditService<R> {
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn create(&self, draft: R::Draft, now: DateTime<Utc>) -> Result<R, EditError> {
        let _guard = self.write_lock.lock();
        let record = self.store.create(draft, now)?;
        info!(kind = R::schema().kind, id = %record.display_id(), "record created");
        Ok(record)
    }

    pub fn update(
        &self,
        id: RecordId,
        patch: R::Patch,
        now: DateTime<Utc>,
    ) -> Result<R, EditError> {
        let _guard = self.write_lock.lock();
        let record = self.store.update(id, patch, now).map_err(|err| {
            if let StoreError::NotFound(missing) = &err {
                warn!(kind = R::schema().kind, id = %missing, "update target missing");
            }
            err
        })?;
        info!(kind = R::schema().kind, id = %record.display_id(), "record updated");
        Ok(record)
    }

    pub fn delete(&self, id: RecordId) -> Result<R, EditError> {
        let _guard = self.write_lock.lock();
        let record = self.store.remove(id).map_err(|err| {
            warn!(kind = R::schema().kind, id = %id, "delete target missing");
            err
        })?;
        info!(kind = R::schema().kind, id = %record.display_id(), "record deleted");
        Ok(record)
    }

    /// Runs `op` over `selection` and commits the result. Exports leave the
    /// store untouched.
    pub fn bulk(
        &self,
        op: &BulkOp<R>,
        selection: &[RecordId],
        now: DateTime<Utc>,
    ) -> Result<BulkOutcome<R>, EditError> {
        let _guard = self.write_lock.lock();
        let current = self.store.list();
        let outcome = bulk::apply(op, selection, &current, now)?;

        if !matches!(op, BulkOp::Export) {
            self.store.replace_all(outcome.updated_store.clone())?;
        }
        if !outcome.failures.is_empty() {
            warn!(
                kind = R::schema().kind,
                missing = ?outcome.failures,
                "bulk selection referenced missing records"
            );
        }
        info!(
            kind = R::schema().kind,
            op = %op.describe(),
            affected = outcome.affected.len(),
            failed = outcome.failures.len(),
            "bulk operation committed"
        );
        Ok(outcome)
    }
}
