use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::edit::BulkChange;
use crate::domain::entities::record::{
    flexible_datetime, format_day, require_text, start_of_day, FieldKind, FieldSpec, FieldValue,
    PatchError, Record, RecordId, RecordSchema, Validate, ValidationError,
};

string_enum! {
    pub enum InvoiceStatus {
        Draft => "draft",
        Sent => "sent",
        Paid => "paid",
        Overdue => "overdue",
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: RecordId,
    pub invoice_number: String,
    pub customer: String,
    #[serde(default)]
    pub customer_email: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    #[serde(with = "flexible_datetime")]
    pub due_date: DateTime<Utc>,
    #[serde(rename = "createdDate", alias = "createdAt", with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItemDraft {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub customer: String,
    pub customer_email: String,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItemDraft>,
    pub notes: String,
}

impl InvoiceDraft {
    /// Rows without a description are blank form rows and are dropped.
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items
            .iter()
            .filter(|item| !item.description.trim().is_empty())
            .map(|item| LineItem {
                description: item.description.trim().to_string(),
                quantity: item.quantity,
                rate: item.rate,
                amount: item.quantity * item.rate,
            })
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.line_items().iter().map(|item| item.amount).sum()
    }
}

impl Validate for InvoiceDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        require_text(&mut errors, "customer", &self.customer, "Customer is required");
        require_text(
            &mut errors,
            "invoiceNumber",
            &self.invoice_number,
            "Invoice number is required",
        );
        if self.due_date.is_none() {
            errors.add("dueDate", "Due date is required");
        }

        let mut described = 0;
        for (index, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                continue;
            }
            described += 1;
            if !(item.quantity > 0.0) {
                errors.add(format!("items.{index}.quantity"), "Quantity must be greater than 0");
            }
            if !(item.rate > 0.0) {
                errors.add(format!("items.{index}.rate"), "Rate must be greater than 0");
            }
        }
        if described == 0 {
            errors.add("items", "At least one item with description is required");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceChange {
    Status(InvoiceStatus),
}

impl BulkChange<Invoice> for InvoiceChange {
    fn describe(&self) -> String {
        match self {
            InvoiceChange::Status(status) => format!("mark as {status}"),
        }
    }

    fn validate(&self, _targets: &[&Invoice]) -> Result<(), ValidationError> {
        Ok(())
    }

    fn apply(&self, record: &mut Invoice, now: DateTime<Utc>) {
        match self {
            InvoiceChange::Status(status) => record.status = *status,
        }
        record.touch(now);
    }
}

/// Counts and totals per status for the invoice header cards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceStats {
    pub total: usize,
    pub draft: usize,
    pub sent: usize,
    pub paid: usize,
    pub overdue: usize,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub pending_amount: f64,
    pub overdue_amount: f64,
}

impl InvoiceStats {
    pub fn from_invoices<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Self {
        let mut stats = InvoiceStats::default();
        for invoice in invoices {
            stats.total += 1;
            stats.total_amount += invoice.amount;
            match invoice.status {
                InvoiceStatus::Draft => stats.draft += 1,
                InvoiceStatus::Sent => {
                    stats.sent += 1;
                    stats.pending_amount += invoice.amount;
                }
                InvoiceStatus::Paid => {
                    stats.paid += 1;
                    stats.paid_amount += invoice.amount;
                }
                InvoiceStatus::Overdue => {
                    stats.overdue += 1;
                    stats.overdue_amount += invoice.amount;
                }
            }
        }
        stats
    }
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec::new("invoice_number", "Invoice Number", FieldKind::Text),
    FieldSpec::new("customer", "Customer", FieldKind::Text),
    FieldSpec::new("customer_email", "Email", FieldKind::Text),
    FieldSpec::new("amount", "Amount", FieldKind::Number),
    FieldSpec::new("status", "Status", FieldKind::Text),
    FieldSpec::new("due_date", "Due Date", FieldKind::Date),
    FieldSpec::new("created_at", "Created", FieldKind::Date),
    FieldSpec::new("updated_at", "Updated", FieldKind::Date),
];

static SCHEMA: RecordSchema = RecordSchema {
    kind: "invoices",
    id_prefix: "INV",
    fields: FIELDS,
    searchable: &["invoice_number", "customer", "customer_email"],
    export_headers: &[
        "Invoice Number",
        "Customer",
        "Email",
        "Amount",
        "Status",
        "Due Date",
        "Created",
    ],
};

impl Invoice {
    pub fn draft(&self) -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: self.invoice_number.clone(),
            customer: self.customer.clone(),
            customer_email: self.customer_email.clone(),
            status: self.status,
            due_date: Some(self.due_date.date_naive()),
            items: self
                .items
                .iter()
                .map(|item| LineItemDraft {
                    description: item.description.clone(),
                    quantity: item.quantity,
                    rate: item.rate,
                })
                .collect(),
            notes: self.notes.clone(),
        }
    }

    fn assign(&mut self, draft: InvoiceDraft) {
        let items = draft.line_items();
        self.amount = items.iter().map(|item| item.amount).sum();
        self.items = items;
        self.invoice_number = draft.invoice_number.trim().to_string();
        self.customer = draft.customer.trim().to_string();
        self.customer_email = draft.customer_email.trim().to_string();
        self.status = draft.status;
        if let Some(due) = draft.due_date {
            self.due_date = start_of_day(due);
        }
        self.notes = draft.notes;
    }
}

impl Record for Invoice {
    type Draft = InvoiceDraft;
    type Patch = InvoiceDraft;
    type Change = InvoiceChange;

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
            "invoice_number" => FieldValue::text(&self.invoice_number),
            "customer" => FieldValue::text(&self.customer),
            "customer_email" => FieldValue::text(&self.customer_email),
            "amount" => FieldValue::Number(self.amount),
            "status" => FieldValue::text(self.status.as_str()),
            "due_date" => FieldValue::Date(self.due_date),
            "created_at" => FieldValue::Date(self.created_at),
            "updated_at" => self.updated_at.map_or(FieldValue::Missing, FieldValue::Date),
            _ => FieldValue::Missing,
        }
    }

    fn display_name(&self) -> &str {
        &self.invoice_number
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.invoice_number.clone(),
            self.customer.clone(),
            self.customer_email.clone(),
            format!("{:.2}", self.amount),
            self.status.to_string(),
            format_day(self.due_date),
            format_day(self.created_at),
        ]
    }

    fn from_draft(id: RecordId, draft: InvoiceDraft, now: DateTime<Utc>) -> Self {
        let mut invoice = Invoice {
            id,
            invoice_number: String::new(),
            customer: String::new(),
            customer_email: String::new(),
            amount: 0.0,
            status: InvoiceStatus::Draft,
            due_date: now,
            created_at: now,
            items: Vec::new(),
            notes: String::new(),
            updated_at: None,
        };
        invoice.assign(draft);
        invoice
    }

    fn apply_patch(&mut self, patch: InvoiceDraft, now: DateTime<Utc>) -> Result<(), PatchError> {
        self.assign(patch);
        self.touch(now);
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.draft().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, quantity: f64, rate: f64) -> LineItemDraft {
        LineItemDraft {
            description: description.to_string(),
            quantity,
            rate,
        }
    }

    fn draft() -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: "INV-2024-010".to_string(),
            customer: "Acme Corporation".to_string(),
            customer_email: "billing@acme.com".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 15),
            items: vec![
                item("Web Development", 40.0, 100.0),
                item("", 0.0, 0.0),
                item("Hosting", 2.0, 50.0),
            ],
            ..InvoiceDraft::default()
        }
    }

    #[test]
    fn amount_is_sum_of_described_items() {
        let now = "2024-01-20T12:00:00Z".parse().expect("timestamp should parse");

        let invoice = Invoice::from_draft(RecordId(3), draft(), now);

        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.amount, 4100.0);
        assert_eq!(format_day(invoice.due_date), "2024-02-15");
    }

    #[test]
    fn validation_reports_item_errors_by_index() {
        let mut form = draft();
        form.items[2].rate = 0.0;
        form.due_date = None;

        let errors = form.validate().expect_err("invalid draft should fail");

        assert_eq!(errors.get("dueDate"), Some("Due date is required"));
        assert_eq!(errors.get("items.2.rate"), Some("Rate must be greater than 0"));
        assert_eq!(errors.get("items.1.quantity"), None);
    }

    #[test]
    fn blank_items_do_not_count_as_line_items() {
        let mut form = draft();
        form.items = vec![item("  ", 1.0, 10.0)];

        let errors = form.validate().expect_err("no described item should fail");

        assert_eq!(
            errors.get("items"),
            Some("At least one item with description is required")
        );
    }

    #[test]
    fn stats_split_amounts_by_status() {
        let now = "2024-01-20T12:00:00Z".parse().expect("timestamp should parse");
        let mut paid = Invoice::from_draft(RecordId(1), draft(), now);
        paid.status = InvoiceStatus::Paid;
        let mut overdue = Invoice::from_draft(RecordId(2), draft(), now);
        overdue.status = InvoiceStatus::Overdue;
        let sent = {
            let mut invoice = Invoice::from_draft(RecordId(3), draft(), now);
            invoice.status = InvoiceStatus::Sent;
            invoice
        };

        let stats = InvoiceStats::from_invoices([&paid, &overdue, &sent]);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.paid, 1);
        assert_eq!(stats.total_amount, 12300.0);
        assert_eq!(stats.paid_amount, 4100.0);
        assert_eq!(stats.pending_amount, 4100.0);
        assert_eq!(stats.overdue_amount, 4100.0);
    }
}
