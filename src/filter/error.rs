use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Unknown filter or sort column: {0}")]
    UnknownColumn(String),

    #[error("Invalid filters parameter: {0}")]
    InvalidFilters(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid sort order: {0}")]
    InvalidSortOrder(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
