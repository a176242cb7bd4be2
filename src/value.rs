//! Typed scalar values
//!
//! Values carry their declared type. Two values are only interchangeable for
//! result reuse when both the type and the value agree, so `PartialEq` here is
//! strict (an `Int(1)` is not equal to a `Long(1)`), while [`Value::compare_to`]
//! implements SQL ordering across the numeric types.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::query::{QueryError, QueryResult};

/// One row of values, in select-list (or table column) order
pub type Row = Vec<Value>;

/// Declared type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    Null,
    Boolean,
    Int,
    Long,
    Double,
    String,
    Timestamp,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "NULL",
            ValueType::Boolean => "BOOLEAN",
            ValueType::Int => "INT",
            ValueType::Long => "BIGINT",
            ValueType::Double => "DOUBLE",
            ValueType::String => "VARCHAR",
            ValueType::Timestamp => "TIMESTAMP",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Long | ValueType::Double)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed scalar value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns the declared type
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Timestamp(_) => ValueType::Timestamp,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical SQL literal for this value
    pub fn sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Boolean(true) => "TRUE".to_string(),
            Value::Boolean(false) => "FALSE".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Double(v) => {
                let s = v.to_string();
                if s.contains('.') || s.contains('e') || !v.is_finite() {
                    s
                } else {
                    format!("{}.0", s)
                }
            }
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }

    /// Converts to a 64-bit integer
    pub fn to_long(&self) -> QueryResult<i64> {
        match self {
            Value::Int(v) => Ok(i64::from(*v)),
            Value::Long(v) => Ok(*v),
            Value::Boolean(b) => Ok(i64::from(*b)),
            Value::Double(d) => {
                if d.is_finite() && *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                    Ok(d.round() as i64)
                } else {
                    Err(QueryError::NumericOverflow(self.sql()))
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| QueryError::InvalidValue(format!("cannot convert {} to BIGINT", self.sql()))),
            Value::Null | Value::Timestamp(_) => Err(QueryError::InvalidValue(format!(
                "cannot convert {} to BIGINT",
                self.sql()
            ))),
        }
    }

    /// Converts to a 32-bit integer
    pub fn to_int(&self) -> QueryResult<i32> {
        let v = self.to_long()?;
        i32::try_from(v).map_err(|_| QueryError::NumericOverflow(self.sql()))
    }

    /// Converts to a double
    pub fn to_double(&self) -> QueryResult<f64> {
        match self {
            Value::Int(v) => Ok(f64::from(*v)),
            Value::Long(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| QueryError::InvalidValue(format!("cannot convert {} to DOUBLE", self.sql()))),
            Value::Null | Value::Timestamp(_) => Err(QueryError::InvalidValue(format!(
                "cannot convert {} to DOUBLE",
                self.sql()
            ))),
        }
    }

    /// Three-valued truth: `None` for NULL
    pub fn to_bool(&self) -> QueryResult<Option<bool>> {
        match self {
            Value::Null => Ok(None),
            Value::Boolean(b) => Ok(Some(*b)),
            Value::Int(v) => Ok(Some(*v != 0)),
            Value::Long(v) => Ok(Some(*v != 0)),
            Value::String(s) => match s.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(Some(true)),
                "FALSE" => Ok(Some(false)),
                _ => Err(QueryError::InvalidValue(format!("cannot convert {} to BOOLEAN", self.sql()))),
            },
            Value::Double(_) | Value::Timestamp(_) => Err(QueryError::InvalidValue(format!(
                "cannot convert {} to BOOLEAN",
                self.sql()
            ))),
        }
    }

    /// SQL ordering between two values.
    ///
    /// Numeric types compare by magnitude regardless of declared type.
    /// Values of unrelated types order by type rank, NULL lowest.
    pub fn compare_to(&self, other: &Value) -> Ordering {
        let (a_type, b_type) = (self.value_type(), other.value_type());
        if a_type.is_numeric() && b_type.is_numeric() {
            return match (self, other) {
                (Value::Double(_), _) | (_, Value::Double(_)) => {
                    let a = self.to_double().unwrap_or(0.0);
                    let b = other.to_double().unwrap_or(0.0);
                    a.total_cmp(&b)
                }
                _ => {
                    let a = self.to_long().unwrap_or(0);
                    let b = other.to_long().unwrap_or(0);
                    a.cmp(&b)
                }
            };
        }
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => a_type.cmp(&b_type),
        }
    }

    /// Converts from a JSON value (CLI fixtures and requests)
    pub fn from_json(json: &serde_json::Value) -> QueryResult<Value> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(match i32::try_from(i) {
                        Ok(small) => Value::Int(small),
                        Err(_) => Value::Long(i),
                    })
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Double(f))
                } else {
                    Err(QueryError::InvalidValue(format!("unsupported number {}", n)))
                }
            }
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            other => Err(QueryError::InvalidValue(format!("unsupported JSON value {}", other))),
        }
    }

    /// Converts to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Long(v) => serde_json::Value::from(*v),
            Value::Double(v) => serde_json::Value::from(*v),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ts) => serde_json::Value::String(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        }
    }

    fn normalized_double_bits(v: f64) -> u64 {
        if v == 0.0 {
            0.0f64.to_bits()
        } else if v.is_nan() {
            f64::NAN.to_bits()
        } else {
            v.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => {
                Self::normalized_double_bits(*a) == Self::normalized_double_bits(*b)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Double(v) => Self::normalized_double_bits(*v).hash(state),
            Value::String(s) => s.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => f.write_str(&other.sql()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
