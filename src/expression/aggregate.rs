//! Aggregate functions over the whole input (no GROUP BY)

use crate::query::QueryResult;
use crate::value::Value;

use super::operation::{self, OpType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    CountAll,
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::CountAll | AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
        }
    }

    pub fn parse(name: &str) -> Option<AggregateKind> {
        let kind = match name.to_ascii_uppercase().as_str() {
            "COUNT" => AggregateKind::Count,
            "SUM" => AggregateKind::Sum,
            "MIN" => AggregateKind::Min,
            "MAX" => AggregateKind::Max,
            _ => return None,
        };
        Some(kind)
    }
}

/// Running state of one aggregate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateData {
    count: i64,
    value: Option<Value>,
}

impl AggregateData {
    /// Feed one input. `input` is `None` for COUNT(*).
    pub(crate) fn add(&mut self, kind: AggregateKind, input: Option<Value>) -> QueryResult<()> {
        let v = match input {
            None => {
                self.count += 1;
                return Ok(());
            }
            Some(Value::Null) => return Ok(()),
            Some(v) => v,
        };
        self.count += 1;
        self.value = match (kind, self.value.take()) {
            (AggregateKind::CountAll | AggregateKind::Count, _) => None,
            (_, None) => Some(v),
            (AggregateKind::Sum, Some(acc)) => Some(operation::apply(OpType::Plus, acc, v)?),
            (AggregateKind::Min, Some(acc)) => Some(if v.compare_to(&acc).is_lt() { v } else { acc }),
            (AggregateKind::Max, Some(acc)) => Some(if v.compare_to(&acc).is_gt() { v } else { acc }),
        };
        Ok(())
    }

    pub(crate) fn result(&self, kind: AggregateKind) -> Value {
        match kind {
            AggregateKind::CountAll | AggregateKind::Count => Value::Long(self.count),
            _ => self.value.clone().unwrap_or(Value::Null),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = AggregateData::default();
    }
}
