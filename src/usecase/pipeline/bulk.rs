use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::entities::edit::{BulkChange, BulkOp};
use crate::domain::entities::record::{Record, RecordId, ValidationError};
use crate::usecase::pipeline::export::{self, ExportArtifact, ExportError};

#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error("no records selected")]
    EmptySelection,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome<R> {
    pub updated_store: Vec<R>,
    /// Selected ids that were found and acted on.
    pub affected: Vec<RecordId>,
    /// Selected ids absent from the store, ascending.
    pub failures: Vec<RecordId>,
    pub export: Option<ExportArtifact>,
}

/// Applies `op` to every selected id. Validation failures reject the whole
/// batch; ids missing from `store` are reported and skipped.
pub fn apply<R: Record>(
    op: &BulkOp<R>,
    selection: &[RecordId],
    store: &[R],
    now: DateTime<Utc>,
) -> Result<BulkOutcome<R>, BulkError> {
    if selection.is_empty() {
        return Err(BulkError::EmptySelection);
    }

    let selected: BTreeSet<RecordId> = selection.iter().copied().collect();
    let present: BTreeSet<RecordId> = store
        .iter()
        .map(R::id)
        .filter(|id| selected.contains(id))
        .collect();
    let failures: Vec<RecordId> = selected.difference(&present).copied().collect();
    let affected: Vec<RecordId> = present.iter().copied().collect();

    let targets: Vec<&R> = store
        .iter()
        .filter(|record| present.contains(&record.id()))
        .collect();

    debug!(
        kind = R::schema().kind,
        op = %op.describe(),
        targets = targets.len(),
        missing = failures.len(),
        "applying bulk operation"
    );

    let (updated_store, export) = match op {
        BulkOp::Update(change) => {
            change.validate(&targets)?;
            let updated = store
                .iter()
                .cloned()
                .map(|mut record| {
                    if present.contains(&record.id()) {
                        change.apply(&mut record, now);
                    }
                    record
                })
                .collect();
            (updated, None)
        }
        BulkOp::Delete => {
            let kept = store
                .iter()
                .filter(|record| !present.contains(&record.id()))
                .cloned()
                .collect();
            (kept, None)
        }
        BulkOp::Export => {
            let artifact = export::to_csv(targets.iter().copied(), now)?;
            (store.to_vec(), Some(artifact))
        }
    };

    Ok(BulkOutcome {
        updated_store,
        affected,
        failures,
        export,
    })
}
