use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Page size used when the caller does not supply a usable `limit`.
pub const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOp {
    In,
    Gte,
    Lte,
    Gt,
    Lt,
    Between,
    Eq,
    Neq,
    UpperEq,
}

impl FilterOp {
    /// Query-string markers, longest first so `$gte` is never read as `$gt`.
    pub const TOKENS: [(&'static str, FilterOp); 9] = [
        ("$gte", FilterOp::Gte),
        ("$lte", FilterOp::Lte),
        ("$btw", FilterOp::Between),
        ("$in", FilterOp::In),
        ("$gt", FilterOp::Gt),
        ("$lt", FilterOp::Lt),
        ("$ne", FilterOp::Neq),
        ("$eq", FilterOp::Eq),
        ("$up", FilterOp::UpperEq),
    ];

    pub fn token(self) -> &'static str {
        match self {
            FilterOp::In => "$in",
            FilterOp::Gte => "$gte",
            FilterOp::Lte => "$lte",
            FilterOp::Gt => "$gt",
            FilterOp::Lt => "$lt",
            FilterOp::Between => "$btw",
            FilterOp::Eq => "$eq",
            FilterOp::Neq => "$ne",
            FilterOp::UpperEq => "$up",
        }
    }

    /// Operators whose raw value is a comma separated list.
    pub fn is_list(self) -> bool {
        matches!(self, FilterOp::In | FilterOp::Between)
    }
}

/// A single filter operand. The parser only produces `Text`, `Bool` and
/// `Null`; the entity layer narrows text into the column's real type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Date(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Uuid(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Values {
    One(Value),
    Many(Vec<Value>),
}

impl Values {
    pub fn first(&self) -> Option<&Value> {
        match self {
            Values::One(v) => Some(v),
            Values::Many(vs) => vs.first(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        let slice: &[Value] = match self {
            Values::One(v) => std::slice::from_ref(v),
            Values::Many(vs) => vs.as_slice(),
        };
        slice.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub values: Values,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, values: Values) -> Self {
        Self { field: field.into(), op, values }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, Values::One(value.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Filter, search, sort and pagination settings for a collection read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOptions {
    pub filter: Vec<Filter>,
    pub sort: Option<Sort>,
    pub search: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            filter: vec![],
            sort: None,
            search: None,
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryOptions {
    pub fn has_filter_on(&self, field: &str) -> bool {
        self.filter.iter().any(|f| f.field == field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// A page query and the matching count query, sharing filter criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub select: SqlResult,
    pub count: SqlResult,
}
