use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{FilterWhere, SearchClause};
use super::options::is_identifier;
use super::types::{Filter, QueryOptions, QueryPlan, Sort, SqlResult, Value, DEFAULT_LIMIT};

/// Builds a paged `SELECT` and the matching `COUNT(*)` for one table.
///
/// Filters, search term, limit and offset are bound parameters. Table,
/// column and sort names are written into the text, so they must already
/// have passed the entity allow-list; they are re-checked as identifiers.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table_name: String,
    filters: Vec<Filter>,
    search: Option<String>,
    searchable: Vec<String>,
    sort: Option<Sort>,
    limit: i64,
    offset: i64,
}

impl SelectQuery {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            filters: vec![],
            search: None,
            searchable: vec![],
            sort: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        })
    }

    /// Applies validated options in one go.
    pub fn assign(&mut self, options: QueryOptions) -> &mut Self {
        self.filters = options.filter;
        self.search = options.search;
        self.sort = options.sort;
        self.limit = options.limit;
        self.offset = options.skip;
        self
    }

    pub fn searchable<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, mut params) = self.where_parts()?;
        let order_clause = FilterOrder::generate(self.sort.as_ref())?;

        let limit_at = params.len() + 1;
        params.push(Value::Int(self.limit.max(1)));
        params.push(Value::Int(self.offset.max(0)));

        let query = [
            format!("SELECT \"{}\".*", self.table_name),
            format!("FROM \"{}\"", self.table_name),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            order_clause,
            format!("LIMIT ${} OFFSET ${}", limit_at, limit_at + 1),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_parts()?;
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_clause)
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_plan(&self) -> Result<QueryPlan, FilterError> {
        Ok(QueryPlan {
            select: self.to_sql()?,
            count: self.to_count_sql()?,
        })
    }

    fn where_parts(&self) -> Result<(String, Vec<Value>), FilterError> {
        let search = self.search.as_deref().map(|term| SearchClause {
            term,
            columns: &self.searchable,
        });
        FilterWhere::generate(&self.filters, search, 0)
    }
}
