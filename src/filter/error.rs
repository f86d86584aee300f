use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("There can only be 2 values for between. i.e. dd-mm-yyyy,dd-mm-yyyy (got {count} for '{field}')")]
    InvalidBetween { field: String, count: usize },

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),
}
