//! Comparisons and boolean connectives (three-valued logic)

use std::cmp::Ordering;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareType {
    Equal,
    NotEqual,
    Bigger,
    BiggerEqual,
    Smaller,
    SmallerEqual,
}

impl CompareType {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareType::Equal => "=",
            CompareType::NotEqual => "<>",
            CompareType::Bigger => ">",
            CompareType::BiggerEqual => ">=",
            CompareType::Smaller => "<",
            CompareType::SmallerEqual => "<=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareType::Equal => ordering.is_eq(),
            CompareType::NotEqual => ordering.is_ne(),
            CompareType::Bigger => ordering.is_gt(),
            CompareType::BiggerEqual => ordering.is_ge(),
            CompareType::Smaller => ordering.is_lt(),
            CompareType::SmallerEqual => ordering.is_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndOr {
    And,
    Or,
}

impl AndOr {
    pub fn keyword(&self) -> &'static str {
        match self {
            AndOr::And => "AND",
            AndOr::Or => "OR",
        }
    }
}

/// Compare two values; NULL on either side yields NULL
pub(crate) fn compare(kind: CompareType, left: &Value, right: &Value) -> Value {
    if left.is_null() || right.is_null() {
        return Value::Null;
    }
    Value::Boolean(kind.accepts(left.compare_to(right)))
}

/// Kleene AND / OR over optional truth values
pub(crate) fn combine(kind: AndOr, left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match kind {
        AndOr::And => match (left, right) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        AndOr::Or => match (left, right) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
    }
}
