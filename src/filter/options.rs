use crate::config::QueryConfig;

use super::error::FilterError;
use super::parser;
use super::types::{QueryOptions, Sort, SortDirection};

impl QueryOptions {
    /// Builds collection-read options from decoded query-string pairs.
    ///
    /// `filter` may repeat; every other key takes its last occurrence.
    /// Unusable `skip`/`limit` values fall back to the defaults and a bad
    /// `sort` is discarded. Only a malformed `$btw` filter is an error.
    pub fn from_pairs<K, V>(pairs: &[(K, V)], config: &QueryConfig) -> Result<Self, FilterError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = QueryOptions {
            limit: config.default_limit,
            ..QueryOptions::default()
        };

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "filter" => {
                    if let Some(filter) = parser::parse(value)? {
                        options.filter.push(filter);
                    } else if !value.is_empty() {
                        tracing::debug!(filter = %value, "Dropping filter without a known operator");
                    }
                }
                "sort" => options.sort = Sort::parse(value),
                "search" => {
                    let term = value.trim();
                    options.search = (!term.is_empty()).then(|| term.to_string());
                }
                "skip" => {
                    options.skip = value.trim().parse().ok().filter(|n: &i64| *n >= 0).unwrap_or(0);
                }
                "limit" => {
                    options.limit = value
                        .trim()
                        .parse()
                        .ok()
                        .filter(|n: &i64| *n > 0)
                        .unwrap_or(config.default_limit);
                }
                _ => {}
            }
        }

        if let Some(max) = config.max_limit {
            options.limit = options.limit.min(max);
        }

        Ok(options)
    }
}

impl Sort {
    /// Parses `field` or `field:asc|desc`. The field must be a bare
    /// identifier; anything with spaces, signs or punctuation is refused.
    pub fn parse(raw: &str) -> Option<Sort> {
        let (field, direction) = match raw.split_once(':') {
            Some((field, dir)) => (field, parse_direction(dir)?),
            None => (raw, SortDirection::Asc),
        };

        if !is_identifier(field) {
            return None;
        }

        Some(Sort {
            field: field.to_string(),
            direction,
        })
    }
}

fn parse_direction(raw: &str) -> Option<SortDirection> {
    if raw.eq_ignore_ascii_case("asc") {
        Some(SortDirection::Asc)
    } else if raw.eq_ignore_ascii_case("desc") {
        Some(SortDirection::Desc)
    } else {
        None
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
