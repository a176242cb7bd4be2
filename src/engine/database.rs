//! In-memory database: catalog, modification clock, settings, metrics

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::observability::MetricsRegistry;
use crate::value::Value;

use super::sequence::Sequence;
use super::settings::DatabaseSettings;
use super::table::{Table, TableType};

/// Process-wide data modification counter.
///
/// Monotonic, never decreases. Every data change advances it and stamps the
/// changed table or sequence with the new value.
#[derive(Debug, Default)]
pub struct ModificationClock(AtomicU64);

impl ModificationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reading
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Advance and return the new reading
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// A database owning tables and sequences
#[derive(Debug)]
pub struct Database {
    name: String,
    settings: DatabaseSettings,
    optimize_reuse_results: AtomicBool,
    clock: Arc<ModificationClock>,
    tables: RwLock<BTreeMap<String, Arc<Table>>>,
    sequences: RwLock<BTreeMap<String, Arc<Sequence>>>,
    metrics: MetricsRegistry,
}

impl Database {
    pub fn new(name: impl Into<String>, settings: DatabaseSettings) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            optimize_reuse_results: AtomicBool::new(settings.optimize_reuse_results),
            settings,
            clock: Arc::new(ModificationClock::new()),
            tables: RwLock::new(BTreeMap::new()),
            sequences: RwLock::new(BTreeMap::new()),
            metrics: MetricsRegistry::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Current reading of the modification clock
    pub fn modification_data_id(&self) -> u64 {
        self.clock.current()
    }

    /// Whether query results may be reused
    pub fn optimize_reuse_results(&self) -> bool {
        self.optimize_reuse_results.load(Ordering::Relaxed)
    }

    /// Runtime switch for result reuse (SET OPTIMIZE_REUSE_RESULTS)
    pub fn set_optimize_reuse_results(&self, enabled: bool) {
        self.optimize_reuse_results.store(enabled, Ordering::Relaxed);
    }

    /// Create a table whose modifications are tracked. Replaces any table
    /// with the same name.
    pub fn create_table(&self, name: &str, columns: &[&str]) -> Arc<Table> {
        self.register_table(name, columns, TableType::Base)
    }

    /// Create a table backed by something outside this database. Its
    /// modifications are not observable, so queries over it are never
    /// reused.
    pub fn create_external_table(&self, name: &str, columns: &[&str]) -> Arc<Table> {
        self.register_table(name, columns, TableType::External)
    }

    fn register_table(&self, name: &str, columns: &[&str], table_type: TableType) -> Arc<Table> {
        let table = Arc::new(Table::new(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            table_type,
            Arc::clone(&self.clock),
        ));
        let mut tables = self.tables.write().unwrap();
        tables.insert(self.identifier_key(name), Arc::clone(&table));
        table
    }

    pub fn find_table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().unwrap().get(&self.identifier_key(name)).cloned()
    }

    /// Create a sequence returning `start`, `start + increment`, ...
    pub fn create_sequence(&self, name: &str, start: i64, increment: i64) -> Arc<Sequence> {
        let sequence = Arc::new(Sequence::new(name, start, increment, Arc::clone(&self.clock)));
        let mut sequences = self.sequences.write().unwrap();
        sequences.insert(self.identifier_key(name), Arc::clone(&sequence));
        sequence
    }

    pub fn find_sequence(&self, name: &str) -> Option<Arc<Sequence>> {
        self.sequences.read().unwrap().get(&self.identifier_key(name)).cloned()
    }

    /// Identifier equality under this database's folding rules
    pub fn equals_identifiers(&self, a: &str, b: &str) -> bool {
        a == b || (self.settings.case_insensitive_identifiers && a.eq_ignore_ascii_case(b))
    }

    /// Value equality under this database's compare mode
    pub fn are_equal(&self, a: &Value, b: &Value) -> bool {
        a.compare_to(b).is_eq()
    }

    fn identifier_key(&self, name: &str) -> String {
        if self.settings.case_insensitive_identifiers {
            name.to_ascii_uppercase()
        } else {
            name.to_string()
        }
    }
}
