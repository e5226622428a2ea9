use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::edit::BulkChange;
use crate::domain::entities::record::{
    flexible_datetime, format_day, require_email, require_text, FieldKind, FieldSpec, FieldValue,
    PatchError, Record, RecordId, RecordSchema, Validate, ValidationError,
};

pub const UNASSIGNED_AGENT: &str = "unassigned";

string_enum! {
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

string_enum! {
    pub enum QueryStatus {
        Open => "open",
        InProgress => "in-progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

impl Default for QueryStatus {
    fn default() -> Self {
        QueryStatus::Open
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryNote {
    pub id: u64,
    pub content: String,
    pub author: String,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportQuery {
    pub id: RecordId,
    pub customer: String,
    pub customer_email: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: QueryStatus,
    #[serde(default = "unassigned")]
    pub assigned_agent: String,
    #[serde(default)]
    pub notes: Vec<QueryNote>,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn unassigned() -> String {
    UNASSIGNED_AGENT.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDraft {
    pub customer: String,
    pub customer_email: String,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub status: QueryStatus,
    pub assigned_agent: String,
}

impl Default for QueryDraft {
    fn default() -> Self {
        QueryDraft {
            customer: String::new(),
            customer_email: String::new(),
            subject: String::new(),
            description: String::new(),
            priority: Priority::default(),
            status: QueryStatus::default(),
            assigned_agent: unassigned(),
        }
    }
}

impl Validate for QueryDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        require_text(&mut errors, "customer", &self.customer, "Customer is required");
        require_email(
            &mut errors,
            "customerEmail",
            &self.customer_email,
            "Customer email is required",
        );
        if self.subject.trim().chars().count() < 5 {
            errors.add("subject", "Subject must be at least 5 characters long");
        }
        if self.description.trim().chars().count() < 10 {
            errors.add("description", "Description must be at least 10 characters long");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoteChange {
    Add { content: String, author: String },
    Edit { id: u64, content: String },
    Remove { id: u64 },
}

/// Edits reachable from the query details panel.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPatch {
    Details(QueryDraft),
    Status(QueryStatus),
    Reassign(String),
    Note(NoteChange),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryChange {
    Status(QueryStatus),
    Reassign(String),
}

impl BulkChange<SupportQuery> for QueryChange {
    fn describe(&self) -> String {
        match self {
            QueryChange::Status(status) => format!("set status to {status}"),
            QueryChange::Reassign(agent) => format!("reassign to {agent}"),
        }
    }

    fn validate(&self, _targets: &[&SupportQuery]) -> Result<(), ValidationError> {
        match self {
            QueryChange::Reassign(agent) if agent.trim().is_empty() => Err(
                ValidationError::single("assignedAgent", "Select an agent to reassign to"),
            ),
            _ => Ok(()),
        }
    }

    fn apply(&self, record: &mut SupportQuery, now: DateTime<Utc>) {
        match self {
            QueryChange::Status(status) => record.status = *status,
            QueryChange::Reassign(agent) => record.assigned_agent = agent.trim().to_string(),
        }
        record.touch(now);
    }
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec::new("display_id", "ID", FieldKind::Text),
    FieldSpec::new("customer", "Customer", FieldKind::Text),
    FieldSpec::new("customer_email", "Email", FieldKind::Text),
    FieldSpec::new("subject", "Subject", FieldKind::Text),
    FieldSpec::new("description", "Description", FieldKind::Text),
    FieldSpec::new("priority", "Priority", FieldKind::Text),
    FieldSpec::new("status", "Status", FieldKind::Text),
    FieldSpec::new("assigned_agent", "Assigned Agent", FieldKind::Text),
    FieldSpec::new("note_count", "Notes", FieldKind::Number),
    FieldSpec::new("created_at", "Created", FieldKind::Date),
    FieldSpec::new("updated_at", "Updated", FieldKind::Date),
];

static SCHEMA: RecordSchema = RecordSchema {
    kind: "queries",
    id_prefix: "QRY",
    fields: FIELDS,
    searchable: &["subject", "customer", "description", "display_id"],
    export_headers: &[
        "ID",
        "Customer",
        "Subject",
        "Priority",
        "Status",
        "Assigned Agent",
        "Created",
    ],
};

impl SupportQuery {
    pub fn draft(&self) -> QueryDraft {
        QueryDraft {
            customer: self.customer.clone(),
            customer_email: self.customer_email.clone(),
            subject: self.subject.clone(),
            description: self.description.clone(),
            priority: self.priority,
            status: self.status,
            assigned_agent: self.assigned_agent.clone(),
        }
    }

    pub fn note(&self, id: u64) -> Option<&QueryNote> {
        self.notes.iter().find(|note| note.id == id)
    }

    fn assign(&mut self, draft: QueryDraft) {
        self.customer = draft.customer.trim().to_string();
        self.customer_email = draft.customer_email.trim().to_string();
        self.subject = draft.subject.trim().to_string();
        self.description = draft.description.trim().to_string();
        self.priority = draft.priority;
        self.status = draft.status;
        self.assigned_agent = if draft.assigned_agent.trim().is_empty() {
            unassigned()
        } else {
            draft.assigned_agent.trim().to_string()
        };
    }

    fn change_note(&mut self, change: NoteChange, now: DateTime<Utc>) -> Result<(), PatchError> {
        match change {
            NoteChange::Add { content, author } => {
                let id = self.notes.iter().map(|note| note.id).max().unwrap_or(0) + 1;
                self.notes.push(QueryNote {
                    id,
                    content: content.trim().to_string(),
                    author,
                    created_at: now,
                    updated_at: None,
                });
            }
            NoteChange::Edit { id, content } => {
                let note = self
                    .notes
                    .iter_mut()
                    .find(|note| note.id == id)
                    .ok_or(PatchError::NoteNotFound(id))?;
                note.content = content.trim().to_string();
                note.updated_at = Some(now);
            }
            NoteChange::Remove { id } => {
                let before = self.notes.len();
                self.notes.retain(|note| note.id != id);
                if self.notes.len() == before {
                    return Err(PatchError::NoteNotFound(id));
                }
            }
        }
        Ok(())
    }
}

impl Record for SupportQuery {
    type Draft = QueryDraft;
    type Patch = QueryPatch;
    type Change = QueryChange;

    fn schema() -> &'static RecordSchema {
        &SCHEMA
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    fn field(&self, key: &str) -> FieldValue<'_> {
        match key {
            "display_id" => FieldValue::Text(Cow::Owned(self.display_id())),
            "customer" => FieldValue::text(&self.customer),
            "customer_email" => FieldValue::text(&self.customer_email),
            "subject" => FieldValue::text(&self.subject),
            "description" => FieldValue::text(&self.description),
            "priority" => FieldValue::text(self.priority.as_str()),
            "status" => FieldValue::text(self.status.as_str()),
            "assigned_agent" => FieldValue::text(&self.assigned_agent),
            "note_count" => FieldValue::Number(self.notes.len() as f64),
            "created_at" => FieldValue::Date(self.created_at),
            "updated_at" => self.updated_at.map_or(FieldValue::Missing, FieldValue::Date),
            _ => FieldValue::Missing,
        }
    }

    fn display_name(&self) -> &str {
        &self.subject
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.display_id(),
            self.customer.clone(),
            self.subject.clone(),
            self.priority.to_string(),
            self.status.to_string(),
            self.assigned_agent.clone(),
            format_day(self.created_at),
        ]
    }

    fn from_draft(id: RecordId, draft: QueryDraft, now: DateTime<Utc>) -> Self {
        let mut query = SupportQuery {
            id,
            customer: String::new(),
            customer_email: String::new(),
            subject: String::new(),
            description: String::new(),
            priority: Priority::default(),
            status: QueryStatus::default(),
            assigned_agent: unassigned(),
            notes: Vec::new(),
            created_at: now,
            updated_at: None,
        };
        query.assign(draft);
        query
    }

    fn apply_patch(&mut self, patch: QueryPatch, now: DateTime<Utc>) -> Result<(), PatchError> {
        match patch {
            QueryPatch::Details(draft) => self.assign(draft),
            QueryPatch::Status(status) => self.status = status,
            QueryPatch::Reassign(agent) => self.assigned_agent = agent.trim().to_string(),
            QueryPatch::Note(change) => self.change_note(change, now)?,
        }
        self.touch(now);
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = match self.draft().validate() {
            Ok(()) => ValidationError::new(),
            Err(errors) => errors,
        };
        if self.assigned_agent.trim().is_empty() {
            errors.add("assignedAgent", "Select an agent to reassign to");
        }
        for note in &self.notes {
            if note.content.trim().is_empty() {
                errors.add(format!("notes.{}", note.id), "Note cannot be empty");
            }
        }
        errors.into_result()
    }
}
