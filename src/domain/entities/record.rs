use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Declares a closed set of string-valued states (status, priority, role).
///
/// Parsing is case-insensitive so snapshots written as `"Paid"` and `"paid"`
/// both load; serialization always emits the canonical lowercase form.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::domain::entities::record::UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let needle = value.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| $crate::domain::entities::record::UnknownValue {
                        kind: stringify!($name),
                        value: value.to_string(),
                    })
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Human-facing identifier such as `QRY-007`.
    pub fn display_with(self, prefix: &str) -> String {
        format!("{prefix}-{:03}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId(value)
    }
}

impl From<RecordId> for u64 {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    List,
}

/// A field read out of a record through its schema key.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Number(f64),
    Date(DateTime<Utc>),
    List(Vec<&'a str>),
    Missing,
}

impl<'a> FieldValue<'a> {
    pub fn text(value: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(value))
    }

    pub fn day(date: NaiveDate) -> Self {
        FieldValue::Date(start_of_day(date))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) if !value.is_nan() => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[&'a str]> {
        match self {
            FieldValue::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { key, label, kind }
    }
}

/// Field-accessor table for one record kind. The pipeline is generic over
/// this descriptor rather than over concrete entity types.
#[derive(Debug)]
pub struct RecordSchema {
    pub kind: &'static str,
    pub id_prefix: &'static str,
    pub fields: &'static [FieldSpec],
    pub searchable: &'static [&'static str],
    pub export_headers: &'static [&'static str],
}

impl RecordSchema {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.key == key)
    }

    pub fn kind_of(&self, key: &str) -> Option<FieldKind> {
        self.field(key).map(|spec| spec.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("note #{0} not found")]
    NoteNotFound(u64),
}

pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    /// Form input for a new record.
    type Draft: Validate + Send;
    /// Partial update merged into an existing record.
    type Patch: Send;
    /// Closed set of bulk updates this kind supports.
    type Change: crate::domain::entities::edit::BulkChange<Self>;

    fn schema() -> &'static RecordSchema;

    fn id(&self) -> RecordId;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn touch(&mut self, now: DateTime<Utc>);

    fn field(&self, key: &str) -> FieldValue<'_>;

    /// Name the user must type to confirm a single delete.
    fn display_name(&self) -> &str;

    /// One export row, aligned with `schema().export_headers`.
    fn export_row(&self) -> Vec<String>;

    fn from_draft(id: RecordId, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> Result<(), PatchError>;

    /// Rules that must hold on a stored record, checked after every patch.
    fn validate(&self) -> Result<(), ValidationError>;

    fn display_id(&self) -> String {
        self.id().display_with(Self::schema().id_prefix)
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Field-level form errors, keyed by field path (`email`, `items.0.rate`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "validation failed: {summary}")
    }
}

impl std::error::Error for ValidationError {}

pub fn is_valid_email(value: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
        .is_match(value)
}

pub fn require_text(errors: &mut ValidationError, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

pub fn require_email(errors: &mut ValidationError, field: &str, value: &str, missing: &str) {
    if value.trim().is_empty() {
        errors.add(field, missing);
    } else if !is_valid_email(value.trim()) {
        errors.add(field, "Please enter a valid email address");
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Parses an RFC 3339 instant or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}

pub fn format_day(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Serde adapter for timestamps that may be stored as a bare date.
pub mod flexible_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_instant(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date or timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_instant_accepts_dates_and_timestamps() {
        let day = parse_instant("2024-01-15").expect("date should parse");
        assert_eq!(format_day(day), "2024-01-15");

        let stamp = parse_instant("2025-01-08T10:30:00Z").expect("timestamp should parse");
        assert_eq!(stamp.to_rfc3339(), "2025-01-08T10:30:00+00:00");

        assert!(parse_instant("next tuesday").is_none());
        assert!(parse_instant("   ").is_none());
    }

    #[test]
    fn email_check_matches_form_rule() {
        assert!(is_valid_email("sarah.johnson@techflow.com"));
        assert!(!is_valid_email("sarah.johnson@techflow"));
        assert!(!is_valid_email("sarah johnson@techflow.com"));
    }

    #[test]
    fn validation_error_keeps_first_message_per_field() {
        let mut errors = ValidationError::new();
        errors.add("email", "Email is required");
        errors.add("email", "Please enter a valid email address");

        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.to_string(), "validation failed: email: Email is required");
    }

    #[test]
    fn record_id_renders_with_kind_prefix() {
        assert_eq!(RecordId(7).display_with("QRY"), "QRY-007");
        assert_eq!(RecordId(1234).display_with("INV"), "INV-1234");
    }
}
