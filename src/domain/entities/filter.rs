use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

use crate::domain::entities::record::{parse_instant, start_of_day};

string_enum! {
    /// Named date windows offered by the filter panels.
    pub enum DateToken {
        Today => "today",
        Yesterday => "yesterday",
        Week => "week",
        ThisWeek => "this-week",
        LastWeek => "last-week",
        Month => "month",
        ThisMonth => "this-month",
        LastMonth => "last-month",
        Quarter => "quarter",
        Year => "year",
    }
}

pub type InstantBounds = (Bound<DateTime<Utc>>, Bound<DateTime<Utc>>);

impl DateToken {
    /// Resolves the token against `now`. Windows that reach the present end at
    /// `now` inclusive; past calendar windows are half-open.
    pub fn window(self, now: DateTime<Utc>) -> InstantBounds {
        let today = now.date_naive();
        let midnight = start_of_day(today);
        let week_start =
            midnight - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
        let month_start = start_of_day(first_of_month(today));
        let until_now = Bound::Included(now);

        match self {
            DateToken::Today => (Bound::Included(midnight), until_now),
            DateToken::Yesterday => (
                Bound::Included(midnight - Duration::days(1)),
                Bound::Excluded(midnight),
            ),
            DateToken::Week => (Bound::Included(now - Duration::days(7)), until_now),
            DateToken::ThisWeek => (Bound::Included(week_start), until_now),
            DateToken::LastWeek => (
                Bound::Included(week_start - Duration::days(7)),
                Bound::Excluded(week_start),
            ),
            DateToken::Month => (Bound::Included(months_before(now, 1)), until_now),
            DateToken::ThisMonth => (Bound::Included(month_start), until_now),
            DateToken::LastMonth => (
                Bound::Included(months_before(month_start, 1)),
                Bound::Excluded(month_start),
            ),
            DateToken::Quarter => (Bound::Included(months_before(now, 3)), until_now),
            DateToken::Year => (Bound::Included(months_before(now, 12)), until_now),
        }
    }
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn months_before(instant: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    instant
        .checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DateRange {
    Token(DateToken),
    /// A token string that did not parse; matches nothing.
    Unknown(String),
    /// Inclusive bounds as `YYYY-MM-DD` or RFC 3339. A bare `to` date covers
    /// that whole day.
    Between {
        from: Option<String>,
        to: Option<String>,
    },
}

impl DateRange {
    pub fn parse_token(raw: &str) -> Self {
        match raw.parse::<DateToken>() {
            Ok(token) => DateRange::Token(token),
            Err(_) => DateRange::Unknown(raw.trim().to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DateRange::Token(_) => false,
            DateRange::Unknown(raw) => raw.is_empty(),
            DateRange::Between { from, to } => is_blank(from) && is_blank(to),
        }
    }

    /// `None` when a bound is malformed.
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<InstantBounds> {
        match self {
            DateRange::Token(token) => Some(token.window(now)),
            DateRange::Unknown(_) => None,
            DateRange::Between { from, to } => {
                let lower = match non_blank(from) {
                    None => Bound::Unbounded,
                    Some(raw) => Bound::Included(parse_instant(raw)?),
                };
                let upper = match non_blank(to) {
                    None => Bound::Unbounded,
                    Some(raw) => upper_bound(raw)?,
                };
                Some((lower, upper))
            }
        }
    }
}

fn upper_bound(raw: &str) -> Option<Bound<DateTime<Utc>>> {
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let next = day.succ_opt()?;
        return Some(Bound::Excluded(start_of_day(next)));
    }
    parse_instant(raw).map(Bound::Included)
}

fn is_blank(value: &Option<String>) -> bool {
    non_blank(value).is_none()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring over the kind's searchable fields.
    Search(String),
    /// Categorical match, ignoring ASCII case.
    Equals { field: String, value: String },
    /// Substring match after lowercasing and joining whitespace runs with `-`.
    Contains { field: String, value: String },
    /// Membership in a list field.
    Includes { field: String, value: String },
    DateRange { field: String, range: DateRange },
    NumberRange {
        field: String,
        min: Option<String>,
        max: Option<String>,
    },
}

impl Predicate {
    pub fn search(value: impl Into<String>) -> Self {
        Predicate::Search(value.into())
    }

    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn includes(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Includes {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn date_token(field: impl Into<String>, token: &str) -> Self {
        Predicate::DateRange {
            field: field.into(),
            range: DateRange::parse_token(token),
        }
    }

    pub fn date_between(
        field: impl Into<String>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Self {
        Predicate::DateRange {
            field: field.into(),
            range: DateRange::Between {
                from: from.map(str::to_string),
                to: to.map(str::to_string),
            },
        }
    }

    pub fn number_range(field: impl Into<String>, min: Option<&str>, max: Option<&str>) -> Self {
        Predicate::NumberRange {
            field: field.into(),
            min: min.map(str::to_string),
            max: max.map(str::to_string),
        }
    }

    /// An empty predicate imposes no constraint.
    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::Search(value) => value.trim().is_empty(),
            Predicate::Equals { value, .. }
            | Predicate::Contains { value, .. }
            | Predicate::Includes { value, .. } => value.trim().is_empty(),
            Predicate::DateRange { range, .. } => range.is_empty(),
            Predicate::NumberRange { min, max, .. } => is_blank(min) && is_blank(max),
        }
    }
}

/// Active filters keyed by filter name (`status`, `client`, `dateRange`, ...).
/// All non-empty predicates must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    predicates: BTreeMap<String, Predicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, predicate: Predicate) -> Self {
        self.set(key, predicate);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, predicate: Predicate) {
        self.predicates.insert(key.into(), predicate);
    }

    pub fn remove(&mut self, key: &str) -> Option<Predicate> {
        self.predicates.remove(key)
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
    }

    pub fn get(&self, key: &str) -> Option<&Predicate> {
        self.predicates.get(key)
    }

    pub fn active(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.values().filter(|predicate| !predicate.is_empty())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        raw.parse().expect("timestamp should parse")
    }

    #[test]
    fn calendar_tokens_use_sunday_week_start() {
        // 2024-03-13 is a Wednesday.
        let now = at("2024-03-13T15:00:00Z");

        let (lower, upper) = DateToken::ThisWeek.window(now);
        assert_eq!(lower, Bound::Included(at("2024-03-10T00:00:00Z")));
        assert_eq!(upper, Bound::Included(now));

        let (lower, upper) = DateToken::LastWeek.window(now);
        assert_eq!(lower, Bound::Included(at("2024-03-03T00:00:00Z")));
        assert_eq!(upper, Bound::Excluded(at("2024-03-10T00:00:00Z")));
    }

    #[test]
    fn last_month_spans_previous_calendar_month() {
        let now = at("2024-03-13T15:00:00Z");

        let (lower, upper) = DateToken::LastMonth.window(now);

        assert_eq!(lower, Bound::Included(at("2024-02-01T00:00:00Z")));
        assert_eq!(upper, Bound::Excluded(at("2024-03-01T00:00:00Z")));
    }

    #[test]
    fn between_bare_to_date_covers_whole_day() {
        let range = DateRange::Between {
            from: Some("2024-01-01".to_string()),
            to: Some("2024-01-31".to_string()),
        };

        let (lower, upper) = range.bounds(at("2024-03-13T00:00:00Z")).expect("bounds should parse");

        assert_eq!(lower, Bound::Included(at("2024-01-01T00:00:00Z")));
        assert_eq!(upper, Bound::Excluded(at("2024-02-01T00:00:00Z")));
    }

    #[test]
    fn malformed_bounds_resolve_to_none() {
        let range = DateRange::Between {
            from: Some("last tuesday".to_string()),
            to: None,
        };

        assert!(range.bounds(at("2024-03-13T00:00:00Z")).is_none());
        assert!(DateRange::parse_token("fortnight").bounds(at("2024-03-13T00:00:00Z")).is_none());
    }

    #[test]
    fn active_count_ignores_empty_predicates() {
        let filters = FilterSet::new()
            .with("search", Predicate::search("  "))
            .with("status", Predicate::equals("status", "paid"))
            .with("amount", Predicate::number_range("amount", None, Some("")));

        assert_eq!(filters.active_count(), 1);
        assert!(!filters.is_empty());
    }
}
