use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::edit::BulkChange;
use crate::domain::entities::record::{
    flexible_datetime, format_day, require_text, start_of_day, FieldKind, FieldSpec, FieldValue,
    PatchError, Record, RecordId, RecordSchema, Validate, ValidationError,
};

string_enum! {
    pub enum ProjectStatus {
        Planning => "planning",
        Active => "active",
        OnHold => "on-hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planning
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
}

impl TeamMember {
    /// `jane-smith` becomes `Jane Smith`.
    pub fn from_id(id: &str) -> Self {
        let name = id
            .split('-')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        TeamMember {
            id: id.to_string(),
            name,
            role: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: u32,
    pub title: String,
    #[serde(with = "flexible_datetime")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub client: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(with = "flexible_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub client: String,
    pub status: ProjectStatus,
    pub progress: i32,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub budget: f64,
    /// Team member ids, e.g. `john-doe`.
    pub team: Vec<String>,
    pub tags: Vec<String>,
}

impl Validate for ProjectDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        require_text(&mut errors, "name", &self.name, "Project name is required");
        require_text(&mut errors, "client", &self.client, "Client selection is required");
        if self.start_date.is_none() {
            errors.add("startDate", "Start date is required");
        }
        match (self.start_date, self.deadline) {
            (_, None) => errors.add("deadline", "Deadline is required"),
            (Some(start), Some(deadline)) if deadline <= start => {
                errors.add("deadline", "Deadline must be after start date")
            }
            _ => {}
        }
        if !(0..=100).contains(&self.progress) {
            errors.add("progress", "Progress must be between 0 and 100");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectChange {
    Status(ProjectStatus),
    AssignTeam(Vec<String>),
    SetDeadline(NaiveDate),
}

impl BulkChange<Project> for ProjectChange {
    fn describe(&self) -> String {
        match self {
            ProjectChange::Status(status) => format!("set status to {status}"),
            ProjectChange::AssignTeam(members) => format!("assign team [{}]", members.join(", ")),
            ProjectChange::SetDeadline(deadline) => format!("set deadline to {deadline}"),
        }
    }

    fn validate(&self, targets: &[&Project]) -> Result<(), ValidationError> {
        match self {
            ProjectChange::Status(_) => Ok(()),
            ProjectChange::AssignTeam(members) => {
                if members.iter().all(|member| member.trim().is_empty()) {
                    return Err(ValidationError::single(
                        "teamMembers",
                        "Select at least one team member",
                    ));
                }
                Ok(())
            }
            ProjectChange::SetDeadline(deadline) => {
                let deadline = start_of_day(*deadline);
                let mut errors = ValidationError::new();
                for project in targets {
                    if deadline <= project.start_date {
                        errors.add(
                            format!("deadline.{}", project.display_id()),
                            format!("Deadline must be after start date for {}", project.name),
                        );
                    }
                }
                errors.into_result()
            }
        }
    }

    fn apply(&self, record: &mut Project, now: DateTime<Utc>) {
        match self {
            ProjectChange::Status(status) => record.status = *status,
            ProjectChange::AssignTeam(members) => {
                record.team = members
                    .iter()
                    .map(|member| member.trim())
                    .filter(|member| !member.is_empty())
                    .map(TeamMember::from_id)
                    .collect();
            }
            ProjectChange::SetDeadline(deadline) => record.deadline = start_of_day(*deadline),
        }
        record.touch(now);
    }
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec::new("name", "Name", FieldKind::Text),
    FieldSpec::new("description", "Description", FieldKind::Text),
    FieldSpec::new("client", "Client", FieldKind::Text),
    FieldSpec::new("status", "Status", FieldKind::Text),
    FieldSpec::new("progress", "Progress", FieldKind::Number),
    FieldSpec::new("start_date", "Start Date", FieldKind::Date),
    FieldSpec::new("deadline", "Deadline", FieldKind::Date),
    FieldSpec::new("budget", "Budget", FieldKind::Number),
    FieldSpec::new("team", "Team", FieldKind::List),
    FieldSpec::new("tags", "Tags", FieldKind::List),
    FieldSpec::new("created_at", "Created", FieldKind::Date),
    FieldSpec::new("updated_at", "Updated", FieldKind::Date),
];

static SCHEMA: RecordSchema = RecordSchema {
    kind: "projects",
    id_prefix: "PRJ",
    fields: FIELDS,
    searchable: &["name", "description", "client"],
    export_headers: &[
        "ID",
        "Name",
        "Client",
        "Status",
        "Progress",
        "Start Date",
        "Deadline",
        "Team",
    ],
};

impl Project {
    pub fn draft(&self) -> ProjectDraft {
        ProjectDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            client: self.client.clone(),
            status: self.status,
            progress: i32::from(self.progress),
            start_date: Some(self.start_date.date_naive()),
            deadline: Some(self.deadline.date_naive()),
            budget: self.budget,
            team: self.team.iter().map(|member| member.id.clone()).collect(),
            tags: self.tags.clone(),
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now
            && !matches!(
                self.status,
                ProjectStatus::Completed | ProjectStatus::Cancelled
            )
    }

    fn assign(&mut self, draft: ProjectDraft) {
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.client = draft.client.trim().to_string();
        self.status = draft.status;
        self.progress = draft.progress.clamp(0, 100) as u8;
        if let Some(start) = draft.start_date {
            self.start_date = start_of_day(start);
        }
        if let Some(deadline) = draft.deadline {
            self.deadline = start_of_day(deadline);
        }
        self.budget = draft.budget;
        // Keep roles of members who stay on the team.
        let previous = std::mem::take(&mut self.team);
        self.team = draft
            .team
            .iter()
            .map(|id| {
                previous
                    .iter()
                    .find(|member| &member.id == id)
                    .cloned()
                    .unwrap_or_else(|| TeamMember::from_id(id))
            })
            .collect();
        self.tags = draft.tags;
    }
}

/// Counts for the project page header. Overdue means past the deadline and
/// neither completed nor cancelled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectStats {
    pub total: usize,
    pub active: usize,
    pub planning: usize,
    pub completed: usize,
    pub overdue: usize,
    pub average_progress: u8,
}

impl ProjectStats {
    pub fn from_projects<'a>(
        projects: impl IntoIterator<Item = &'a Project>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut stats = ProjectStats::default();
        let mut progress_sum = 0u64;
        for project in projects {
            stats.total += 1;
            progress_sum += u64::from(project.progress);
            match project.status {
                ProjectStatus::Active => stats.active += 1,
                ProjectStatus::Planning => stats.planning += 1,
                ProjectStatus::Completed => stats.completed += 1,
                ProjectStatus::OnHold | ProjectStatus::Cancelled => {}
            }
            if project.is_overdue(now) {
                stats.overdue += 1;
            }
        }
        if stats.total > 0 {
            let average = (progress_sum as f64 / stats.total as f64).round();
            stats.average_progress = average as u8;
        }
        stats
    }
}

impl Record for Project {
    type Draft = ProjectDraft;
    type Patch = ProjectDraft;
    type Change = ProjectChange;

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
            "name" => FieldValue::text(&self.name),
            "description" => FieldValue::text(&self.description),
            "client" => FieldValue::text(&self.client),
            "status" => FieldValue::text(self.status.as_str()),
            "progress" => FieldValue::Number(f64::from(self.progress)),
            "start_date" => FieldValue::Date(self.start_date),
            "deadline" => FieldValue::Date(self.deadline),
            "budget" => FieldValue::Number(self.budget),
            "team" => FieldValue::List(self.team.iter().map(|member| member.id.as_str()).collect()),
            "tags" => FieldValue::List(self.tags.iter().map(String::as_str).collect()),
            "created_at" => FieldValue::Date(self.created_at),
            "updated_at" => self.updated_at.map_or(FieldValue::Missing, FieldValue::Date),
            _ => FieldValue::Missing,
        }
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.display_id(),
            self.name.clone(),
            self.client.clone(),
            self.status.to_string(),
            format!("{}%", self.progress),
            format_day(self.start_date),
            format_day(self.deadline),
            self.team
                .iter()
                .map(|member| member.name.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        ]
    }

    fn from_draft(id: RecordId, draft: ProjectDraft, now: DateTime<Utc>) -> Self {
        let mut project = Project {
            id,
            name: String::new(),
            description: String::new(),
            client: String::new(),
            status: ProjectStatus::Planning,
            progress: 0,
            start_date: now,
            deadline: now,
            budget: 0.0,
            team: Vec::new(),
            milestones: Vec::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: None,
        };
        project.assign(draft);
        project
    }

    fn apply_patch(&mut self, patch: ProjectDraft, now: DateTime<Utc>) -> Result<(), PatchError> {
        self.assign(patch);
        self.touch(now);
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.draft().validate()
    }
}
