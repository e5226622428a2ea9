use std::cmp::Ordering;

use crate::domain::entities::dataset::{SortDirection, SortSpec};
use crate::domain::entities::record::{FieldKind, FieldValue, Record};

/// Compares two records on the spec's key. Unknown keys compare equal.
pub fn compare<R: Record>(a: &R, b: &R, spec: &SortSpec) -> Ordering {
    if spec.is_unsorted() {
        return Ordering::Equal;
    }
    let Some(kind) = R::schema().kind_of(&spec.key) else {
        return Ordering::Equal;
    };

    let ordering = compare_values(&a.field(&spec.key), &b.field(&spec.key), kind);
    match spec.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Returns a stably sorted copy; ties keep their input order in both
/// directions.
pub fn sort<R: Record>(records: &[R], spec: &SortSpec) -> Vec<R> {
    let mut sorted = records.to_vec();
    if spec.is_unsorted() || R::schema().kind_of(&spec.key).is_none() {
        return sorted;
    }
    sorted.sort_by(|a, b| compare(a, b, spec));
    sorted
}

fn compare_values(a: &FieldValue<'_>, b: &FieldValue<'_>, kind: FieldKind) -> Ordering {
    match kind {
        FieldKind::Number => compare_present(a.as_number(), b.as_number(), |x, y| x.total_cmp(y)),
        FieldKind::Date => compare_present(a.as_date(), b.as_date(), |x, y| x.cmp(y)),
        FieldKind::Text => compare_present(
            a.as_text().map(str::to_lowercase),
            b.as_text().map(str::to_lowercase),
            |x, y| x.cmp(y),
        ),
        FieldKind::List => compare_present(a.as_list(), b.as_list(), |x, y| {
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }),
    }
}

/// Missing values sort before present ones.
fn compare_present<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(&x, &y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
