//! Per-entity allow-lists and the coercion that narrows raw query-string
//! filters into typed, column-safe predicates.
//!
//! Only names declared in an entity's `FIELDS` ever reach SQL text. Filters
//! on anything else are dropped, as are filters whose values do not fit
//! the column's type.

pub mod post;
pub mod user;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::filter::{Filter, FilterError, FilterOp, QueryOptions, QueryPlan, SelectQuery, Sort, Value, Values};

pub use post::{NewPost, Post, PostChanges};
pub use user::{NewUser, User, UserChanges};

/// Columns that exist on several tables and are always written qualified.
pub const RESERVED_FIELDS: [&str; 5] = ["created_at", "updated_at", "id", "is_archived", "status"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Uuid,
    Bool,
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub filterable: bool,
    pub sortable: bool,
    pub searchable: bool,
}

impl FieldSpec {
    pub const fn column(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, filterable: true, sortable: true, searchable: false }
    }

    /// A text column that also takes part in free-text search.
    pub const fn text_search(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Text, filterable: true, sortable: true, searchable: true }
    }
}

pub trait Entity {
    const TABLE: &'static str;
    const FIELDS: &'static [FieldSpec];

    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    /// Column reference as it should appear in SQL for this entity.
    fn qualify(name: &str) -> String {
        if RESERVED_FIELDS.contains(&name) {
            format!("{}.{}", Self::TABLE, name)
        } else {
            name.to_string()
        }
    }

    fn search_columns() -> Vec<String> {
        Self::FIELDS
            .iter()
            .filter(|f| f.searchable)
            .map(|f| format!("{}.{}", Self::TABLE, f.name))
            .collect()
    }
}

/// Keeps only filters on allow-listed fields whose values coerce to the
/// column type. Reserved field names come back table-qualified.
pub fn build_filter<E: Entity>(filters: Vec<Filter>) -> Vec<Filter> {
    filters
        .into_iter()
        .filter_map(|filter| {
            let Some(spec) = E::field(&filter.field).filter(|f| f.filterable) else {
                tracing::debug!(table = E::TABLE, field = %filter.field, "Dropping filter on unknown field");
                return None;
            };
            let Some(values) = coerce_values(spec.kind, filter.op, filter.values) else {
                tracing::debug!(table = E::TABLE, field = %filter.field, "Dropping filter with unusable value");
                return None;
            };
            Some(Filter::new(E::qualify(spec.name), filter.op, values))
        })
        .collect()
}

/// Returns the sort only if it names a sortable field.
pub fn validate_sort<E: Entity>(sort: Option<Sort>) -> Option<Sort> {
    let sort = sort?;
    match E::field(&sort.field) {
        Some(spec) if spec.sortable => Some(Sort { field: E::qualify(spec.name), ..sort }),
        _ => {
            tracing::debug!(table = E::TABLE, field = %sort.field, "Discarding sort on unknown field");
            None
        }
    }
}

pub fn prepare<E: Entity>(options: QueryOptions) -> QueryOptions {
    QueryOptions {
        filter: build_filter::<E>(options.filter),
        sort: validate_sort::<E>(options.sort),
        ..options
    }
}

/// Validates `options` against `E` and renders the page and count queries.
pub fn plan<E: Entity>(options: QueryOptions) -> Result<QueryPlan, FilterError> {
    let mut query = SelectQuery::new(E::TABLE)?;
    query.assign(prepare::<E>(options)).searchable(E::search_columns());
    query.to_plan()
}

fn coerce_values(kind: FieldKind, op: FilterOp, values: Values) -> Option<Values> {
    if op == FilterOp::UpperEq && kind != FieldKind::Text {
        return None;
    }
    match values {
        Values::One(Value::Null) if matches!(op, FilterOp::Eq | FilterOp::Neq) => Some(Values::One(Value::Null)),
        Values::One(value) => coerce_value(kind, value).map(Values::One),
        Values::Many(items) => items
            .into_iter()
            .map(|v| coerce_value(kind, v))
            .collect::<Option<Vec<_>>>()
            .map(Values::Many),
    }
}

fn coerce_value(kind: FieldKind, value: Value) -> Option<Value> {
    match (kind, value) {
        (_, Value::Null) => None,
        (FieldKind::Text, Value::Text(s)) => Some(Value::Text(s)),
        (FieldKind::Text, Value::Bool(b)) => Some(Value::Text(b.to_string())),
        (FieldKind::Bool, Value::Bool(b)) => Some(Value::Bool(b)),
        (FieldKind::Uuid, Value::Text(s)) => Uuid::parse_str(s.trim()).ok().map(Value::Uuid),
        (FieldKind::Uuid, v @ Value::Uuid(_)) => Some(v),
        (FieldKind::Timestamp, Value::Text(s)) => parse_timestamp(&s).map(Value::Date),
        (FieldKind::Timestamp, v @ Value::Date(_)) => Some(v),
        _ => None,
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD` and `DD-MM-YYYY`.
/// Bare dates resolve to midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    ["%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{parser, SortDirection};

    fn raw(exprs: &[&str]) -> Vec<Filter> {
        exprs.iter().filter_map(|e| parser::parse(e).unwrap()).collect()
    }

    #[test]
    fn only_allow_listed_fields_survive() {
        let kept = build_filter::<Post>(raw(&[
            "title$eq=T",
            "password$eq=x",
            "\"title\";drop$eq=1",
            "nope$in=1,2",
            "content$up=hello",
        ]));
        let names: Vec<&str> = kept.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["title", "content"]);
        assert!(kept.iter().all(|f| Post::field(&f.field).is_some()));
    }

    #[test]
    fn reserved_fields_are_table_qualified() {
        let kept = build_filter::<Post>(raw(&["is_archived$eq=false", "created_at$gte=2024-01-01"]));
        assert_eq!(kept[0].field, "posts.is_archived");
        assert_eq!(kept[0].values, Values::One(Value::Bool(false)));
        assert_eq!(kept[1].field, "posts.created_at");
    }

    #[test]
    fn values_that_do_not_fit_the_column_are_dropped() {
        let kept = build_filter::<Post>(raw(&[
            "user_id$eq=not-a-uuid",
            "created_at$gt=yesterday",
            "is_archived$eq=maybe",
            "is_archived$up=true",
            "title$gt=null",
        ]));
        assert!(kept.is_empty(), "{kept:?}");
    }

    #[test]
    fn between_dates_coerce_both_ends() {
        let kept = build_filter::<Post>(raw(&["created_at$btw=01-01-2024,2024-02-01T10:00:00Z"]));
        let Values::Many(ends) = &kept[0].values else { panic!("expected a list") };
        assert_eq!(ends.len(), 2);
        assert!(matches!(ends[0], Value::Date(_)));
        assert!(matches!(ends[1], Value::Date(_)));
    }

    #[test]
    fn null_equality_is_kept() {
        let kept = build_filter::<Post>(raw(&["organization_id$eq=null"]));
        assert_eq!(kept[0].values, Values::One(Value::Null));
    }

    #[test]
    fn boolean_literal_on_text_column_stays_text() {
        let kept = build_filter::<Post>(raw(&["title$eq=true"]));
        assert_eq!(kept[0].values, Values::One(Value::Text("true".into())));
    }

    #[test]
    fn sort_must_name_a_sortable_field() {
        let sort = Sort { field: "created_at".into(), direction: SortDirection::Desc };
        assert_eq!(validate_sort::<Post>(Some(sort)).map(|s| s.field), Some("posts.created_at".into()));

        let sort = Sort { field: "password".into(), direction: SortDirection::Asc };
        assert_eq!(validate_sort::<User>(Some(sort)), None);
    }

    #[test]
    fn plan_for_posts_searches_title_and_content() {
        let options = QueryOptions {
            search: Some("hello".into()),
            filter: raw(&["title$eq=T"]),
            ..QueryOptions::default()
        };
        let plan = plan::<Post>(options).unwrap();
        assert!(plan.select.query.contains("\"posts\".\"title\" ILIKE $2 ESCAPE '\\' OR \"posts\".\"content\" ILIKE $2 ESCAPE '\\'"));
        assert!(plan.count.query.starts_with("SELECT COUNT(*) AS count FROM \"posts\" WHERE \"title\" = $1"));
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T12:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-03-01T12:00:00").is_some());
        assert_eq!(parse_timestamp("2024-03-01"), parse_timestamp("01-03-2024"));
        assert!(parse_timestamp("March 1st").is_none());
    }
}
