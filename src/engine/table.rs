//! In-memory tables
//!
//! A table stamps itself with the modification clock on every change, which
//! is what the result cache compares against. Rows are copied out on scan.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::observability::{log_event_with_fields, Event};
use crate::query::{QueryError, QueryResult};
use crate::value::Row;

use super::database::ModificationClock;
use super::session::Session;

/// Whether modifications of a table are observable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    /// Rows live here; every change advances the clock
    Base,
    /// Rows come from outside (linked or system table); freshness unknown
    External,
}

/// Called before every SELECT that reads the table, cached or not
pub trait SelectTrigger: Send + Sync {
    fn before_select(&self, session: &Session, table: &Table);
}

pub struct Table {
    name: String,
    columns: Vec<String>,
    table_type: TableType,
    rows: RwLock<Vec<Row>>,
    last_modification_id: AtomicU64,
    clock: Arc<ModificationClock>,
    triggers: RwLock<Vec<Arc<dyn SelectTrigger>>>,
}

impl Table {
    pub(crate) fn new(
        name: &str,
        columns: Vec<String>,
        table_type: TableType,
        clock: Arc<ModificationClock>,
    ) -> Self {
        Self {
            name: name.to_string(),
            columns,
            table_type,
            rows: RwLock::new(Vec::new()),
            last_modification_id: AtomicU64::new(clock.current()),
            clock,
            triggers: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn table_type(&self) -> TableType {
        self.table_type
    }

    /// Append a row. The row must have one value per column.
    pub fn insert(&self, row: Row) -> QueryResult<()> {
        if row.len() != self.columns.len() {
            return Err(QueryError::InvalidValue(format!(
                "table {} has {} columns, row has {}",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }
        self.rows.write().unwrap().push(row);
        self.mark_modified();
        Ok(())
    }

    /// Remove every row matching `predicate`, returning the number removed
    pub fn delete_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Row) -> bool,
    {
        let removed = {
            let mut rows = self.rows.write().unwrap();
            let before = rows.len();
            rows.retain(|r| !predicate(r));
            before - rows.len()
        };
        if removed > 0 {
            self.mark_modified();
        }
        removed
    }

    /// Remove every row
    pub fn truncate(&self) {
        self.rows.write().unwrap().clear();
        self.mark_modified();
    }

    /// Copy of the current rows
    pub fn rows(&self) -> Vec<Row> {
        self.rows.read().unwrap().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Clock value of the last change. `u64::MAX` when changes are not
    /// observable.
    pub fn max_data_modification_id(&self) -> u64 {
        match self.table_type {
            TableType::Base => self.last_modification_id.load(Ordering::SeqCst),
            TableType::External => u64::MAX,
        }
    }

    pub fn add_trigger(&self, trigger: Arc<dyn SelectTrigger>) {
        self.triggers.write().unwrap().push(trigger);
    }

    /// Run every before-select trigger
    pub fn fire_before_select(&self, session: &Session) {
        let triggers: Vec<Arc<dyn SelectTrigger>> = self.triggers.read().unwrap().clone();
        for trigger in triggers {
            trigger.before_select(session, self);
            session.database().metrics().increment_triggers_fired();
            log_event_with_fields(Event::TriggerFired, &[("table", &self.name)]);
        }
    }

    fn mark_modified(&self) {
        self.record_modification(self.clock.advance());
    }

    /// Concurrent writers may arrive out of clock order; the id never goes back.
    fn record_modification(&self, id: u64) {
        self.last_modification_id.fetch_max(id, Ordering::SeqCst);
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("table_type", &self.table_type)
            .field("last_modification_id", &self.last_modification_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Database, DatabaseSettings};
    use crate::value::Value;
    use std::sync::atomic::AtomicUsize;

    struct CountingTrigger(AtomicUsize);

    impl SelectTrigger for CountingTrigger {
        fn before_select(&self, _session: &Session, _table: &Table) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_insert_checks_arity() {
        let db = Database::new("t", DatabaseSettings::default());
        let table = db.create_table("T", &["A", "B"]);
        assert!(table.insert(vec![Value::Int(1)]).is_err());
        assert!(table.insert(vec![Value::Int(1), Value::Null]).is_ok());
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_every_change_advances_modification_id() {
        let db = Database::new("t", DatabaseSettings::default());
        let table = db.create_table("T", &["A"]);
        table.insert(vec![Value::Int(1)]).unwrap();
        let after_insert = table.max_data_modification_id();

        assert_eq!(table.delete_where(|r| r[0] == Value::Int(1)), 1);
        let after_delete = table.max_data_modification_id();
        assert!(after_delete > after_insert);

        // nothing removed, nothing changed
        assert_eq!(table.delete_where(|_| true), 0);
        assert_eq!(table.max_data_modification_id(), after_delete);

        table.truncate();
        assert!(table.max_data_modification_id() > after_delete);
    }

    #[test]
    fn test_out_of_order_stamps_keep_latest() {
        let db = Database::new("t", DatabaseSettings::default());
        let table = db.create_table("T", &["A"]);
        table.record_modification(6);
        table.record_modification(5);
        assert_eq!(table.max_data_modification_id(), 6);
    }

    #[test]
    fn test_external_table_is_unbounded() {
        let db = Database::new("t", DatabaseSettings::default());
        let table = db.create_external_table("LINKED", &["A"]);
        assert_eq!(table.max_data_modification_id(), u64::MAX);
    }

    #[test]
    fn test_triggers_fire() {
        let db = Database::new("t", DatabaseSettings::default());
        let session = Session::new(Arc::clone(&db), "SA");
        let table = db.create_table("T", &["A"]);
        let trigger = Arc::new(CountingTrigger(AtomicUsize::new(0)));
        table.add_trigger(trigger.clone());

        table.fire_before_select(&session);
        table.fire_before_select(&session);

        assert_eq!(trigger.0.load(Ordering::SeqCst), 2);
        assert_eq!(db.metrics().snapshot().triggers_fired, 2);
    }
}
