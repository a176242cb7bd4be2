//! Bound parameters
//!
//! A parameter is a shared slot: the query's parameter list and every place
//! in the expression tree that uses it hold the same `Arc<Parameter>`.

use std::sync::{Arc, RwLock};

use crate::query::{QueryError, QueryResult};
use crate::value::Value;

#[derive(Debug)]
pub struct Parameter {
    index: usize,
    value: RwLock<Option<Value>>,
}

impl Parameter {
    /// Create an unbound parameter. `index` is 0-based.
    pub fn new(index: usize) -> Arc<Self> {
        Arc::new(Self {
            index,
            value: RwLock::new(None),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_value(&self, value: impl Into<Value>) {
        *self.value.write().unwrap() = Some(value.into());
    }

    pub fn clear(&self) {
        *self.value.write().unwrap() = None;
    }

    pub fn is_set(&self) -> bool {
        self.value.read().unwrap().is_some()
    }

    /// Bound value, NULL while unbound
    pub fn param_value(&self) -> Value {
        self.value.read().unwrap().clone().unwrap_or(Value::Null)
    }

    /// Bound value, or `ParameterNotSet` (1-based) while unbound
    pub fn value(&self) -> QueryResult<Value> {
        self.value
            .read()
            .unwrap()
            .clone()
            .ok_or(QueryError::ParameterNotSet(self.index + 1))
    }

    pub fn sql(&self) -> String {
        format!("?{}", self.index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_parameter() {
        let p = Parameter::new(0);
        assert!(!p.is_set());
        assert_eq!(p.param_value(), Value::Null);
        assert_eq!(p.value(), Err(QueryError::ParameterNotSet(1)));
        assert_eq!(p.sql(), "?1");
    }

    #[test]
    fn test_bind_and_clear() {
        let p = Parameter::new(2);
        p.set_value(7);
        assert_eq!(p.value().unwrap(), Value::Int(7));
        p.clear();
        assert!(!p.is_set());
    }
}
