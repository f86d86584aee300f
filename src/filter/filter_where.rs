use super::error::FilterError;
use super::options::is_identifier;
use super::types::{Filter, FilterOp, Value, Values};

/// Free-text search: one term matched against several columns.
#[derive(Debug, Clone)]
pub struct SearchClause<'a> {
    pub term: &'a str,
    pub columns: &'a [String],
}

/// Renders validated filters into a parameterized `WHERE` body. Values are
/// always bound; only allow-listed column names are written into the text.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Returns the joined conditions (empty when there are none) and the
    /// values they bind, numbered from `starting_param_index + 1`.
    pub fn generate(
        filters: &[Filter],
        search: Option<SearchClause<'_>>,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let mut conditions = Vec::with_capacity(filters.len() + 1);

        for filter in filters {
            conditions.push(filter_where.build_condition(filter)?);
        }

        if let Some(search) = search {
            if let Some(sql) = filter_where.build_search(&search)? {
                conditions.push(sql);
            }
        }

        Ok((conditions.join(" AND "), filter_where.param_values))
    }

    fn build_condition(&mut self, filter: &Filter) -> Result<String, FilterError> {
        let column = quote_column(&filter.field)?;

        match (filter.op, &filter.values) {
            (FilterOp::Eq, Values::One(Value::Null)) => Ok(format!("{} IS NULL", column)),
            (FilterOp::Neq, Values::One(Value::Null)) => Ok(format!("{} IS NOT NULL", column)),
            (FilterOp::Eq, Values::One(v)) => Ok(format!("{} = {}", column, self.param(v.clone()))),
            (FilterOp::Neq, Values::One(v)) => Ok(format!("{} <> {}", column, self.param(v.clone()))),
            (FilterOp::UpperEq, Values::One(v)) => {
                let v = self.non_null(filter, v)?;
                Ok(format!("UPPER({}) = UPPER({})", column, self.param(v)))
            }
            (FilterOp::Gt, Values::One(v)) => self.compare(&column, ">", filter, v),
            (FilterOp::Gte, Values::One(v)) => self.compare(&column, ">=", filter, v),
            (FilterOp::Lt, Values::One(v)) => self.compare(&column, "<", filter, v),
            (FilterOp::Lte, Values::One(v)) => self.compare(&column, "<=", filter, v),
            (FilterOp::In, Values::Many(values)) => {
                if values.is_empty() {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "$in on '{}' requires at least one value",
                        filter.field
                    )));
                }
                let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                Ok(format!("{} IN ({})", column, params.join(", ")))
            }
            (FilterOp::In, Values::One(v)) => Ok(format!("{} IN ({})", column, self.param(v.clone()))),
            (FilterOp::Between, Values::Many(values)) => match values.as_slice() {
                [low, high] => {
                    let low = self.non_null(filter, low)?;
                    let high = self.non_null(filter, high)?;
                    Ok(format!("{} BETWEEN {} AND {}", column, self.param(low), self.param(high)))
                }
                _ => Err(FilterError::InvalidBetween {
                    field: filter.field.clone(),
                    count: values.len(),
                }),
            },
            (op, _) => Err(FilterError::InvalidOperatorData(format!(
                "{} on '{}' does not accept a value list",
                op.token(),
                filter.field
            ))),
        }
    }

    fn compare(&mut self, column: &str, sql_op: &str, filter: &Filter, value: &Value) -> Result<String, FilterError> {
        let value = self.non_null(filter, value)?;
        Ok(format!("{} {} {}", column, sql_op, self.param(value)))
    }

    fn non_null(&self, filter: &Filter, value: &Value) -> Result<Value, FilterError> {
        if value.is_null() {
            return Err(FilterError::InvalidOperatorData(format!(
                "{} on '{}' cannot compare against null",
                filter.op.token(),
                filter.field
            )));
        }
        Ok(value.clone())
    }

    fn build_search(&mut self, search: &SearchClause<'_>) -> Result<Option<String>, FilterError> {
        if search.columns.is_empty() || search.term.is_empty() {
            return Ok(None);
        }
        let columns = search
            .columns
            .iter()
            .map(|c| quote_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        // One bound pattern shared by every column.
        let placeholder = self.param(Value::Text(format!("%{}%", escape_like(search.term))));
        let parts: Vec<String> = columns
            .iter()
            .map(|c| format!("{} ILIKE {} ESCAPE '\\'", c, placeholder))
            .collect();
        Ok(Some(format!("({})", parts.join(" OR "))))
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// The search term matches literally: LIKE wildcards are escaped.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Quotes `column` or `table.column`, refusing anything that is not a plain
/// identifier in each segment.
pub fn quote_column(name: &str) -> Result<String, FilterError> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 || !segments.iter().all(|s| is_identifier(s)) {
        return Err(FilterError::InvalidColumn(name.to_string()));
    }
    Ok(segments
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_sql(filters: &[Filter]) -> (String, Vec<Value>) {
        FilterWhere::generate(filters, None, 0).unwrap()
    }

    #[test]
    fn equality_and_null_handling() {
        let (sql, params) = where_sql(&[
            Filter::eq("title", "T"),
            Filter::eq("organization_id", Value::Null),
            Filter::new("posts.is_archived", FilterOp::Neq, Values::One(Value::Null)),
        ]);
        assert_eq!(
            sql,
            "\"title\" = $1 AND \"organization_id\" IS NULL AND \"posts\".\"is_archived\" IS NOT NULL"
        );
        assert_eq!(params, vec![Value::Text("T".into())]);
    }

    #[test]
    fn ranges_sets_and_case_insensitive_equality() {
        let (sql, params) = where_sql(&[
            Filter::new("a", FilterOp::Gte, Values::One("1".into())),
            Filter::new("b", FilterOp::In, Values::Many(vec!["x".into(), "y".into()])),
            Filter::new("c", FilterOp::Between, Values::Many(vec!["l".into(), "h".into()])),
            Filter::new("d", FilterOp::UpperEq, Values::One("MiXeD".into())),
        ]);
        assert_eq!(
            sql,
            "\"a\" >= $1 AND \"b\" IN ($2, $3) AND \"c\" BETWEEN $4 AND $5 AND UPPER(\"d\") = UPPER($6)"
        );
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn search_binds_a_single_pattern() {
        let columns = vec!["posts.title".to_string(), "posts.content".to_string()];
        let (sql, params) = FilterWhere::generate(
            &[Filter::eq("title", "T")],
            Some(SearchClause { term: "rust", columns: &columns }),
            0,
        )
        .unwrap();
        assert_eq!(
            sql,
            "\"title\" = $1 AND (\"posts\".\"title\" ILIKE $2 ESCAPE '\\' OR \"posts\".\"content\" ILIKE $2 ESCAPE '\\')"
        );
        assert_eq!(params[1], Value::Text("%rust%".into()));
    }

    #[test]
    fn search_wildcards_match_literally() {
        let columns = vec!["posts.title".to_string()];
        let (_, params) =
            FilterWhere::generate(&[], Some(SearchClause { term: "50%_off\\", columns: &columns }), 0).unwrap();
        assert_eq!(params, vec![Value::Text("%50\\%\\_off\\\\%".into())]);
    }

    #[test]
    fn hostile_values_never_reach_the_sql_text() {
        let (sql, params) = where_sql(&[Filter::eq("title", "x'; DROP TABLE posts; --")]);
        assert!(!sql.contains("DROP"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn bad_columns_are_refused() {
        for bad in ["title;", "a.b.c", "\"x\"", "1a", ""] {
            assert!(FilterWhere::generate(&[Filter::eq(bad, "v")], None, 0).is_err(), "{bad}");
        }
    }

    #[test]
    fn between_with_wrong_arity_is_refused() {
        let err = FilterWhere::generate(
            &[Filter::new("c", FilterOp::Between, Values::Many(vec!["l".into()]))],
            None,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidBetween { count: 1, .. }));
    }

    #[test]
    fn range_against_null_is_refused() {
        let result = FilterWhere::generate(
            &[Filter::new("a", FilterOp::Gt, Values::One(Value::Null))],
            None,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn numbering_continues_from_the_starting_index() {
        let (sql, _) = FilterWhere::generate(&[Filter::eq("a", "1")], None, 3).unwrap();
        assert_eq!(sql, "\"a\" = $4");
    }
}
