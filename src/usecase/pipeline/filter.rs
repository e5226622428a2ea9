use std::ops::{Bound, RangeBounds};

use chrono::{DateTime, Utc};

use crate::domain::entities::filter::{FilterSet, Predicate};
use crate::domain::entities::record::{FieldValue, Record};

/// Keeps the records every active predicate accepts, in input order.
pub fn apply<R: Record>(records: &[R], filters: &FilterSet, now: DateTime<Utc>) -> Vec<R> {
    let active: Vec<&Predicate> = filters.active().collect();
    if active.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| active.iter().all(|predicate| matches(*record, predicate, now)))
        .cloned()
        .collect()
}

pub fn matches<R: Record>(record: &R, predicate: &Predicate, now: DateTime<Utc>) -> bool {
    if predicate.is_empty() {
        return true;
    }

    match predicate {
        Predicate::Search(term) => {
            let needle = term.trim().to_lowercase();
            R::schema().searchable.iter().any(|key| {
                record
                    .field(key)
                    .as_text()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
        Predicate::Equals { field, value } => match record.field(field) {
            FieldValue::Text(text) => text.trim().eq_ignore_ascii_case(value.trim()),
            FieldValue::List(items) => items
                .iter()
                .any(|item| item.eq_ignore_ascii_case(value.trim())),
            _ => false,
        },
        Predicate::Contains { field, value } => record
            .field(field)
            .as_text()
            .is_some_and(|text| slug(text).contains(&slug(value))),
        Predicate::Includes { field, value } => record
            .field(field)
            .as_list()
            .is_some_and(|items| items.iter().any(|item| *item == value.trim())),
        Predicate::DateRange { field, range } => {
            let Some(bounds) = range.bounds(now) else {
                return false;
            };
            record
                .field(field)
                .as_date()
                .is_some_and(|instant| bounds.contains(&instant))
        }
        Predicate::NumberRange { field, min, max } => {
            let (Some(lower), Some(upper)) = (number_bound(min), number_bound(max)) else {
                return false;
            };
            record
                .field(field)
                .as_number()
                .is_some_and(|number| (lower, upper).contains(&number))
        }
    }
}

/// `Unbounded` for a blank side, `None` for an unparseable one.
fn number_bound(raw: &Option<String>) -> Option<Bound<f64>> {
    match raw.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Some(Bound::Unbounded),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|value| !value.is_nan())
            .map(Bound::Included),
    }
}

/// Lowercases and joins whitespace runs with `-`, so `Acme Corporation`
/// and `acme-corporation` compare equal.
pub fn slug(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
