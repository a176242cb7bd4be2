//! Arithmetic and string concatenation

use crate::query::{QueryError, QueryResult};
use crate::value::{Value, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Concat,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulus,
}

impl OpType {
    pub fn symbol(&self) -> &'static str {
        match self {
            OpType::Concat => "||",
            OpType::Plus => "+",
            OpType::Minus => "-",
            OpType::Multiply => "*",
            OpType::Divide => "/",
            OpType::Modulus => "%",
        }
    }
}

/// Apply a binary operator. NULL in, NULL out.
pub(crate) fn apply(op: OpType, left: Value, right: Value) -> QueryResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if op == OpType::Concat {
        return Ok(Value::String(format!("{}{}", left, right)));
    }
    let (lt, rt) = (left.value_type(), right.value_type());
    if !lt.is_numeric() || !rt.is_numeric() {
        return Err(QueryError::InvalidValue(format!(
            "{} {} {} is not a numeric operation",
            left.sql(),
            op.symbol(),
            right.sql()
        )));
    }
    if lt == ValueType::Double || rt == ValueType::Double {
        return apply_double(op, left.to_double()?, right.to_double()?);
    }
    if lt == ValueType::Int && rt == ValueType::Int {
        let (a, b) = (left.to_int()?, right.to_int()?);
        let overflow = || QueryError::NumericOverflow(format!("{} {} {}", a, op.symbol(), b));
        let result = match op {
            OpType::Plus => a.checked_add(b).ok_or_else(overflow)?,
            OpType::Minus => a.checked_sub(b).ok_or_else(overflow)?,
            OpType::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
            OpType::Divide => {
                if b == 0 {
                    return Err(QueryError::DivisionByZero);
                }
                a.checked_div(b).ok_or_else(overflow)?
            }
            OpType::Modulus => {
                if b == 0 {
                    return Err(QueryError::DivisionByZero);
                }
                a.checked_rem(b).ok_or_else(overflow)?
            }
            OpType::Concat => unreachable!(),
        };
        return Ok(Value::Int(result));
    }
    let (a, b) = (left.to_long()?, right.to_long()?);
    let overflow = || QueryError::NumericOverflow(format!("{} {} {}", a, op.symbol(), b));
    let result = match op {
        OpType::Plus => a.checked_add(b).ok_or_else(overflow)?,
        OpType::Minus => a.checked_sub(b).ok_or_else(overflow)?,
        OpType::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
        OpType::Divide => {
            if b == 0 {
                return Err(QueryError::DivisionByZero);
            }
            a.checked_div(b).ok_or_else(overflow)?
        }
        OpType::Modulus => {
            if b == 0 {
                return Err(QueryError::DivisionByZero);
            }
            a.checked_rem(b).ok_or_else(overflow)?
        }
        OpType::Concat => unreachable!(),
    };
    Ok(Value::Long(result))
}

fn apply_double(op: OpType, a: f64, b: f64) -> QueryResult<Value> {
    let result = match op {
        OpType::Plus => a + b,
        OpType::Minus => a - b,
        OpType::Multiply => a * b,
        OpType::Divide => {
            if b == 0.0 {
                return Err(QueryError::DivisionByZero);
            }
            a / b
        }
        OpType::Modulus => {
            if b == 0.0 {
                return Err(QueryError::DivisionByZero);
            }
            a % b
        }
        OpType::Concat => unreachable!(),
    };
    Ok(Value::Double(result))
}

/// Unary minus
pub(crate) fn negate(value: Value) -> QueryResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(v) => v
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| QueryError::NumericOverflow(format!("-({})", v))),
        Value::Long(v) => v
            .checked_neg()
            .map(Value::Long)
            .ok_or_else(|| QueryError::NumericOverflow(format!("-({})", v))),
        Value::Double(v) => Ok(Value::Double(-v)),
        other => Err(QueryError::InvalidValue(format!("cannot negate {}", other.sql()))),
    }
}
