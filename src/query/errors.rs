//! Query error types
//!
//! Error codes:
//! - AERO_ORDER_BY_NOT_IN_RESULT (REJECT)
//! - AERO_COLUMN_NOT_FOUND (REJECT)
//! - AERO_AMBIGUOUS_COLUMN (REJECT)
//! - AERO_COLUMN_COUNT_MISMATCH (REJECT)
//! - AERO_PARAMETER_NOT_SET (REJECT)
//! - AERO_INVALID_VALUE (ERROR)
//! - AERO_DIVISION_BY_ZERO (ERROR)
//! - AERO_NUMERIC_OVERFLOW (ERROR)
//! - AERO_COLUMN_NOT_EVALUATABLE (ERROR)
//! - AERO_GLOBAL_CONDITION_NOT_ALLOWED (REJECT)
//! - AERO_QUERY_NOT_INITIALIZED (REJECT)
//!
//! None of these are retried: they surface to the caller as a failure of
//! the current prepare or execute call. A cache miss is never an error.

use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while preparing or executing a query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// ORDER BY entry could not be matched, or its ordinal is out of range
    #[error("Order by expression {0} must be in the result list in this case")]
    OrderByNotInResult(String),

    #[error("Column {0} not found")]
    ColumnNotFound(String),

    #[error("Ambiguous column name {0}")]
    AmbiguousColumn(String),

    /// UNION children produce a different number of columns
    #[error("The used SELECT statements have a different number of columns ({0} and {1})")]
    ColumnCountMismatch(usize, usize),

    /// Parameter index is 1-based
    #[error("Parameter #{0} is not set")]
    ParameterNotSet(usize),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Numeric value out of range: {0}")]
    NumericOverflow(String),

    /// Column is bound to an outer query or a filter that is not evaluatable yet
    #[error("Column {0} can not be evaluated here")]
    ColumnNotEvaluatable(String),

    #[error("Adding a global condition is not allowed for this query")]
    GlobalConditionNotAllowed,

    #[error("Query has not been initialized")]
    NotInitialized,
}

impl QueryError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::OrderByNotInResult(_) => "AERO_ORDER_BY_NOT_IN_RESULT",
            QueryError::ColumnNotFound(_) => "AERO_COLUMN_NOT_FOUND",
            QueryError::AmbiguousColumn(_) => "AERO_AMBIGUOUS_COLUMN",
            QueryError::ColumnCountMismatch(_, _) => "AERO_COLUMN_COUNT_MISMATCH",
            QueryError::ParameterNotSet(_) => "AERO_PARAMETER_NOT_SET",
            QueryError::InvalidValue(_) => "AERO_INVALID_VALUE",
            QueryError::DivisionByZero => "AERO_DIVISION_BY_ZERO",
            QueryError::NumericOverflow(_) => "AERO_NUMERIC_OVERFLOW",
            QueryError::ColumnNotEvaluatable(_) => "AERO_COLUMN_NOT_EVALUATABLE",
            QueryError::GlobalConditionNotAllowed => "AERO_GLOBAL_CONDITION_NOT_ALLOWED",
            QueryError::NotInitialized => "AERO_QUERY_NOT_INITIALIZED",
        }
    }

    /// Whether the statement itself was rejected (as opposed to failing
    /// while rows were being computed)
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            QueryError::InvalidValue(_)
                | QueryError::DivisionByZero
                | QueryError::NumericOverflow(_)
                | QueryError::ColumnNotEvaluatable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            QueryError::OrderByNotInResult("ID".into()).code(),
            "AERO_ORDER_BY_NOT_IN_RESULT"
        );
        assert_eq!(QueryError::ParameterNotSet(1).code(), "AERO_PARAMETER_NOT_SET");
        assert_eq!(QueryError::DivisionByZero.code(), "AERO_DIVISION_BY_ZERO");
    }

    #[test]
    fn test_error_display_names_offender() {
        let err = QueryError::OrderByNotInResult("T.ID".into());
        let display = format!("{}", err);
        assert!(display.contains("T.ID"));
        assert!(display.contains("result list"));
    }

    #[test]
    fn test_rejection_classification() {
        assert!(QueryError::OrderByNotInResult("3".into()).is_rejection());
        assert!(QueryError::ColumnCountMismatch(1, 2).is_rejection());
        assert!(!QueryError::DivisionByZero.is_rejection());
    }
}
