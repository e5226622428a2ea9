use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::edit::BulkChange;
use crate::domain::entities::record::{
    flexible_datetime, format_day, require_email, require_text, FieldKind, FieldSpec, FieldValue,
    PatchError, Record, RecordId, RecordSchema, Validate, ValidationError,
};

string_enum! {
    pub enum CustomerStatus {
        Active => "active",
        Inactive => "inactive",
        Pending => "pending",
    }
}

impl Default for CustomerStatus {
    fn default() -> Self {
        CustomerStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    pub company: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub status: CustomerStatus,
    #[serde(with = "flexible_datetime")]
    pub last_contact: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub total_invoices: u32,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub open_queries: u32,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Add/edit form for a customer. Edits submit the whole form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDraft {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub industry: String,
    pub status: CustomerStatus,
    pub notes: String,
}

impl Validate for CustomerDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        require_text(&mut errors, "name", &self.name, "Customer name is required");
        require_text(&mut errors, "company", &self.company, "Company name is required");
        require_email(&mut errors, "email", &self.email, "Email is required");
        require_text(&mut errors, "phone", &self.phone, "Phone number is required");
        require_text(&mut errors, "industry", &self.industry, "Please select an industry");
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomerChange {
    Status(CustomerStatus),
}

impl BulkChange<Customer> for CustomerChange {
    fn describe(&self) -> String {
        match self {
            CustomerChange::Status(status) => format!("set status to {status}"),
        }
    }

    fn validate(&self, _targets: &[&Customer]) -> Result<(), ValidationError> {
        Ok(())
    }

    fn apply(&self, record: &mut Customer, now: DateTime<Utc>) {
        match self {
            CustomerChange::Status(status) => record.status = *status,
        }
        record.touch(now);
    }
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec::new("name", "Name", FieldKind::Text),
    FieldSpec::new("company", "Company", FieldKind::Text),
    FieldSpec::new("email", "Email", FieldKind::Text),
    FieldSpec::new("phone", "Phone", FieldKind::Text),
    FieldSpec::new("city", "City", FieldKind::Text),
    FieldSpec::new("country", "Country", FieldKind::Text),
    FieldSpec::new("industry", "Industry", FieldKind::Text),
    FieldSpec::new("status", "Status", FieldKind::Text),
    FieldSpec::new("last_contact", "Last Contact", FieldKind::Date),
    FieldSpec::new("total_invoices", "Invoices", FieldKind::Number),
    FieldSpec::new("total_revenue", "Revenue", FieldKind::Number),
    FieldSpec::new("open_queries", "Open Queries", FieldKind::Number),
    FieldSpec::new("created_at", "Created", FieldKind::Date),
    FieldSpec::new("updated_at", "Updated", FieldKind::Date),
];

static SCHEMA: RecordSchema = RecordSchema {
    kind: "customers",
    id_prefix: "CUS",
    fields: FIELDS,
    searchable: &["name", "company", "email"],
    export_headers: &[
        "Name",
        "Company",
        "Email",
        "Phone",
        "Status",
        "Industry",
        "Last Contact",
    ],
};

impl Customer {
    pub fn draft(&self) -> CustomerDraft {
        CustomerDraft {
            name: self.name.clone(),
            company: self.company.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
            country: self.country.clone(),
            industry: self.industry.clone(),
            status: self.status,
            notes: self.notes.clone(),
        }
    }
}

impl Record for Customer {
    type Draft = CustomerDraft;
    type Patch = CustomerDraft;
    type Change = CustomerChange;

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
            "company" => FieldValue::text(&self.company),
            "email" => FieldValue::text(&self.email),
            "phone" => FieldValue::text(&self.phone),
            "city" => FieldValue::text(&self.city),
            "country" => FieldValue::text(&self.country),
            "industry" => FieldValue::text(&self.industry),
            "status" => FieldValue::text(self.status.as_str()),
            "last_contact" => FieldValue::Date(self.last_contact),
            "total_invoices" => FieldValue::Number(f64::from(self.total_invoices)),
            "total_revenue" => FieldValue::Number(self.total_revenue),
            "open_queries" => FieldValue::Number(f64::from(self.open_queries)),
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
            self.name.clone(),
            self.company.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.status.to_string(),
            self.industry.clone(),
            format_day(self.last_contact),
        ]
    }

    fn from_draft(id: RecordId, draft: CustomerDraft, now: DateTime<Utc>) -> Self {
        Customer {
            id,
            name: draft.name.trim().to_string(),
            company: draft.company.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone,
            address: draft.address,
            city: draft.city,
            state: draft.state,
            zip_code: draft.zip_code,
            country: draft.country,
            industry: draft.industry,
            status: draft.status,
            last_contact: now,
            notes: draft.notes,
            total_invoices: 0,
            total_revenue: 0.0,
            open_queries: 0,
            created_at: now,
            updated_at: None,
        }
    }

    fn apply_patch(&mut self, patch: CustomerDraft, now: DateTime<Utc>) -> Result<(), PatchError> {
        self.name = patch.name.trim().to_string();
        self.company = patch.company.trim().to_string();
        self.email = patch.email.trim().to_string();
        self.phone = patch.phone;
        self.address = patch.address;
        self.city = patch.city;
        self.state = patch.state;
        self.zip_code = patch.zip_code;
        self.country = patch.country;
        self.industry = patch.industry;
        self.status = patch.status;
        self.notes = patch.notes;
        self.touch(now);
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.draft().validate()
    }
}
