//! Table filters: a table reference in a FROM list

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::table::Table;

static NEXT_FILTER_ID: AtomicU64 = AtomicU64::new(1);

/// Something a column reference can be bound to
pub trait ColumnResolver {
    /// Identity used to recognise bindings made against this resolver
    fn resolver_id(&self) -> u64;

    /// Alias a qualified column must name to match
    fn table_alias(&self) -> &str;

    fn column_names(&self) -> &[String];

    /// Position of this resolver's row in the evaluation context
    fn slot(&self) -> usize;
}

/// A table in the FROM list, with its alias
#[derive(Debug, Clone)]
pub struct TableFilter {
    id: u64,
    table: Arc<Table>,
    alias: Option<String>,
    slot: usize,
    evaluatable: bool,
}

impl TableFilter {
    pub fn new(table: Arc<Table>, alias: Option<&str>) -> Self {
        Self {
            id: NEXT_FILTER_ID.fetch_add(1, Ordering::Relaxed),
            table,
            alias: alias.map(str::to_string),
            slot: 0,
            evaluatable: true,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// The alias as written, or the table name when there is none
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.table.name())
    }

    pub(crate) fn set_slot(&mut self, slot: usize) {
        self.slot = slot;
    }

    pub fn is_evaluatable(&self) -> bool {
        self.evaluatable
    }

    pub fn set_evaluatable(&mut self, evaluatable: bool) {
        self.evaluatable = evaluatable;
    }
}

impl ColumnResolver for TableFilter {
    fn resolver_id(&self) -> u64 {
        self.id
    }

    fn table_alias(&self) -> &str {
        self.alias()
    }

    fn column_names(&self) -> &[String] {
        self.table.columns()
    }

    fn slot(&self) -> usize {
        self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Database, DatabaseSettings};

    #[test]
    fn test_alias_defaults_to_table_name() {
        let db = Database::new("t", DatabaseSettings::default());
        let table = db.create_table("ORDERS", &["ID"]);

        let plain = TableFilter::new(Arc::clone(&table), None);
        let aliased = TableFilter::new(table, Some("O"));

        assert_eq!(plain.alias(), "ORDERS");
        assert_eq!(aliased.alias(), "O");
        assert_ne!(plain.id(), aliased.id());
    }
}
