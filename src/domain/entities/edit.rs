use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::entities::record::{Record, ValidationError};

pub const BULK_DELETE_PHRASE: &str = "DELETE";

/// One kind's closed set of bulk updates.
pub trait BulkChange<R>: Clone + fmt::Debug + Send + Sync {
    fn describe(&self) -> String;

    /// Checks the change against every targeted record before anything is
    /// written. Any error rejects the whole batch.
    fn validate(&self, targets: &[&R]) -> Result<(), ValidationError>;

    fn apply(&self, record: &mut R, now: DateTime<Utc>);
}

#[derive(Debug, Clone)]
pub enum BulkOp<R: Record> {
    Update(R::Change),
    Delete,
    Export,
}

impl<R: Record> BulkOp<R> {
    pub fn describe(&self) -> String {
        match self {
            BulkOp::Update(change) => change.describe(),
            BulkOp::Delete => "delete".to_string(),
            BulkOp::Export => "export".to_string(),
        }
    }
}

/// What the user must type before a destructive delete is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteConfirmation {
    Single { name: String },
    Bulk,
}

impl DeleteConfirmation {
    pub fn single<R: Record>(record: &R) -> Self {
        DeleteConfirmation::Single {
            name: record.display_name().to_string(),
        }
    }

    pub fn required_text(&self) -> &str {
        match self {
            DeleteConfirmation::Single { name } => name,
            DeleteConfirmation::Bulk => BULK_DELETE_PHRASE,
        }
    }

    pub fn is_satisfied(&self, typed: &str) -> bool {
        let required = self.required_text();
        !required.is_empty() && typed == required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_delete_requires_exact_phrase() {
        let gate = DeleteConfirmation::Bulk;

        assert!(gate.is_satisfied("DELETE"));
        assert!(!gate.is_satisfied("delete"));
        assert!(!gate.is_satisfied("DELETE "));
    }

    #[test]
    fn single_delete_requires_record_name() {
        let gate = DeleteConfirmation::Single {
            name: "Sarah Johnson".to_string(),
        };

        assert!(gate.is_satisfied("Sarah Johnson"));
        assert!(!gate.is_satisfied("Sarah"));
        assert!(!DeleteConfirmation::Single { name: String::new() }.is_satisfied(""));
    }
}
