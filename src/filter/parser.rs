//! Query-string filter expressions: `<field><operator>=<value>`.
//!
//! ```text
//! title$eq=Hello          -> title = 'Hello'
//! created_at$btw=a,b      -> created_at BETWEEN a AND b
//! id$in=1,2,3             -> id IN (1, 2, 3)
//! ```
//!
//! The operator marker must close the field segment. Anything without a
//! recognised marker is dropped rather than rejected.

use super::error::FilterError;
use super::types::{Filter, FilterOp, Value, Values};

pub fn parse(raw: &str) -> Result<Option<Filter>, FilterError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let Some((lhs, rhs)) = raw.split_once('=') else {
        return Ok(None);
    };

    let Some((field, op)) = split_operator(lhs) else {
        return Ok(None);
    };

    let values = if op.is_list() {
        let items: Vec<Value> = rhs.split(',').map(coerce).collect();
        if op == FilterOp::Between && items.len() != 2 {
            return Err(FilterError::InvalidBetween {
                field: field.to_string(),
                count: items.len(),
            });
        }
        Values::Many(items)
    } else {
        Values::One(coerce(rhs))
    };

    Ok(Some(Filter::new(field, op, values)))
}

fn split_operator(lhs: &str) -> Option<(&str, FilterOp)> {
    FilterOp::TOKENS.iter().find_map(|(token, op)| {
        lhs.strip_suffix(token)
            .filter(|field| !field.is_empty())
            .map(|field| (field, *op))
    })
}

fn coerce(token: &str) -> Value {
    match token {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" | "undefined" => Value::Null,
        other => Value::Text(other.to_string()),
    }
}
