//! Built-in scalar functions

use chrono::Utc;
use rand::Rng;

use crate::query::{QueryError, QueryResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Rand,
    CurrentTimestamp,
    CurrentUser,
    Upper,
    Lower,
    Length,
    Abs,
    Coalesce,
}

impl FunctionKind {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionKind::Rand => "RAND",
            FunctionKind::CurrentTimestamp => "CURRENT_TIMESTAMP",
            FunctionKind::CurrentUser => "CURRENT_USER",
            FunctionKind::Upper => "UPPER",
            FunctionKind::Lower => "LOWER",
            FunctionKind::Length => "LENGTH",
            FunctionKind::Abs => "ABS",
            FunctionKind::Coalesce => "COALESCE",
        }
    }

    /// Same arguments always give the same result
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, FunctionKind::Rand | FunctionKind::CurrentTimestamp)
    }

    /// Result does not depend on the calling session
    pub fn is_independent(&self) -> bool {
        !matches!(self, FunctionKind::CurrentUser | FunctionKind::CurrentTimestamp)
    }

    pub fn parse(name: &str) -> Option<FunctionKind> {
        let kind = match name.to_ascii_uppercase().as_str() {
            "RAND" => FunctionKind::Rand,
            "CURRENT_TIMESTAMP" => FunctionKind::CurrentTimestamp,
            "CURRENT_USER" => FunctionKind::CurrentUser,
            "UPPER" => FunctionKind::Upper,
            "LOWER" => FunctionKind::Lower,
            "LENGTH" => FunctionKind::Length,
            "ABS" => FunctionKind::Abs,
            "COALESCE" => FunctionKind::Coalesce,
            _ => return None,
        };
        Some(kind)
    }
}

/// Apply `kind` to already evaluated arguments
pub(crate) fn call(kind: FunctionKind, user: &str, args: Vec<Value>) -> QueryResult<Value> {
    let first = || args.first().cloned().unwrap_or(Value::Null);
    let value = match kind {
        FunctionKind::Rand => Value::Double(rand::thread_rng().gen::<f64>()),
        FunctionKind::CurrentTimestamp => Value::Timestamp(Utc::now().naive_utc()),
        FunctionKind::CurrentUser => Value::String(user.to_string()),
        FunctionKind::Upper => match first() {
            Value::Null => Value::Null,
            v => Value::String(v.to_string().to_uppercase()),
        },
        FunctionKind::Lower => match first() {
            Value::Null => Value::Null,
            v => Value::String(v.to_string().to_lowercase()),
        },
        FunctionKind::Length => match first() {
            Value::Null => Value::Null,
            v => Value::Long(v.to_string().chars().count() as i64),
        },
        FunctionKind::Abs => match first() {
            Value::Null => Value::Null,
            Value::Int(v) => Value::Int(
                v.checked_abs()
                    .ok_or_else(|| QueryError::NumericOverflow(format!("ABS({})", v)))?,
            ),
            Value::Long(v) => Value::Long(
                v.checked_abs()
                    .ok_or_else(|| QueryError::NumericOverflow(format!("ABS({})", v)))?,
            ),
            Value::Double(v) => Value::Double(v.abs()),
            other => return Err(QueryError::InvalidValue(format!("ABS({})", other.sql()))),
        },
        FunctionKind::Coalesce => args.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null),
    };
    Ok(value)
}
