use thiserror::Error;

/// Rejections raised while turning a filter document into SQL or evaluating
/// it in memory. None of these reach the database.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Table names come from configuration and must be plain identifiers.
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid where clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid data for operator: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}
