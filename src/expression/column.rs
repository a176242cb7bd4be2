//! Column references
//!
//! A column starts unbound, as written in the statement. `map_columns`
//! binds it to the first resolver (table filter) whose alias and column
//! list match, remembering the nesting level: level 0 is the query's own
//! FROM list, higher levels are enclosing queries.

use crate::engine::{ColumnResolver, Database};
use crate::query::{QueryError, QueryResult};
use crate::value::Value;

use super::context::EvalContext;

/// Where a column reference was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBinding {
    pub resolver_id: u64,
    pub level: usize,
    pub slot: usize,
    pub column: usize,
    pub evaluatable: bool,
}

#[derive(Debug, Clone)]
pub struct ExpressionColumn {
    table_alias: Option<String>,
    column_name: String,
    binding: Option<ColumnBinding>,
}

impl ExpressionColumn {
    pub fn new(table_alias: Option<&str>, column_name: &str) -> Self {
        Self {
            table_alias: table_alias.map(str::to_string),
            column_name: column_name.to_string(),
            binding: None,
        }
    }

    /// Qualifying alias as written (`T` in `T.ID`)
    pub fn table_alias(&self) -> Option<&str> {
        self.table_alias.as_deref()
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn binding(&self) -> Option<&ColumnBinding> {
        self.binding.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.binding.is_some()
    }

    pub fn sql(&self) -> String {
        match &self.table_alias {
            Some(alias) => format!("{}.{}", quote_identifier(alias), quote_identifier(&self.column_name)),
            None => quote_identifier(&self.column_name),
        }
    }

    /// Bind against `resolver` unless already bound.
    ///
    /// Two different resolvers at the same level offering the same
    /// column make the reference ambiguous. A binding at a lower level
    /// always wins over a later one at a higher level.
    pub fn map_columns(&mut self, resolver: &dyn ColumnResolver, level: usize, db: &Database) -> QueryResult<()> {
        if let Some(alias) = &self.table_alias {
            if !db.equals_identifiers(alias, resolver.table_alias()) {
                return Ok(());
            }
        }
        let position = resolver
            .column_names()
            .iter()
            .position(|name| db.equals_identifiers(&self.column_name, name));
        let Some(column) = position else {
            return Ok(());
        };
        match self.binding {
            None => {
                self.binding = Some(ColumnBinding {
                    resolver_id: resolver.resolver_id(),
                    level,
                    slot: resolver.slot(),
                    column,
                    evaluatable: true,
                });
                Ok(())
            }
            Some(b) if b.level == level && b.resolver_id != resolver.resolver_id() => {
                Err(QueryError::AmbiguousColumn(self.sql()))
            }
            Some(_) => Ok(()),
        }
    }

    pub fn set_evaluatable(&mut self, resolver_id: u64, evaluatable: bool) {
        if let Some(b) = self.binding.as_mut() {
            if b.resolver_id == resolver_id {
                b.evaluatable = evaluatable;
            }
        }
    }

    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> QueryResult<Value> {
        let binding = self
            .binding
            .as_ref()
            .ok_or_else(|| QueryError::ColumnNotFound(self.sql()))?;
        if binding.level > 0 || !binding.evaluatable {
            return Err(QueryError::ColumnNotEvaluatable(self.sql()));
        }
        ctx.row(binding.slot)
            .and_then(|row| row.get(binding.column))
            .cloned()
            .ok_or_else(|| QueryError::ColumnNotEvaluatable(self.sql()))
    }
}

/// Quote an identifier unless it is a plain upper-case name
pub(crate) fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_uppercase() || first == '_')
                && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    };
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
