use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::entities::customer::Customer;
use crate::domain::entities::invoice::Invoice;
use crate::domain::entities::project::Project;
use crate::domain::entities::query::SupportQuery;

/// All four record collections as one JSON document. Missing collections
/// load as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub customers: Vec<Customer>,
    pub invoices: Vec<Invoice>,
    pub projects: Vec<Project>,
    pub queries: Vec<SupportQuery>,
}

impl Snapshot {
    pub fn record_count(&self) -> usize {
        self.customers.len() + self.invoices.len() + self.projects.len() + self.queries.len()
    }
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot: {}", path.display()))
}

pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(snapshot).context("failed to encode snapshot")?;
    std::fs::write(path, raw)
        .with_context(|| format!("failed to write snapshot: {}", path.display()))
}
