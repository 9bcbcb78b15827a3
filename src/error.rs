use thiserror::Error;

/// Caller errors raised while composing a list query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("column {0:?} is not sortable")]
    UnknownSortColumn(String),
}
