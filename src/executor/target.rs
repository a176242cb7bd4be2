//! Streaming result sink

use crate::value::Row;

/// Receives rows as they are produced instead of a materialized result
pub trait ResultTarget {
    fn add_row(&mut self, row: Row);

    fn row_count(&self) -> usize;
}

impl ResultTarget for Vec<Row> {
    fn add_row(&mut self, row: Row) {
        self.push(row);
    }

    fn row_count(&self) -> usize {
        self.len()
    }
}
