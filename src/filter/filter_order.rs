use super::error::FilterError;
use super::filter_where::quote_column;
use super::types::Sort;

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(sort: Option<&Sort>) -> Result<String, FilterError> {
        let Some(sort) = sort else {
            return Ok(String::new());
        };
        Ok(format!("ORDER BY {} {}", quote_column(&sort.field)?, sort.direction.to_sql()))
    }
}
