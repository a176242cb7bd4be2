//! Materialized query results

use std::sync::Arc;

use crate::value::Row;

/// A computed result: read-only shared rows plus a private cursor.
///
/// Shallow copies share the row storage but never the cursor or the
/// closed flag, so a cached result can be handed out repeatedly while
/// each holder iterates on its own.
#[derive(Debug)]
pub struct LocalResult {
    rows: Arc<Vec<Row>>,
    column_count: usize,
    cursor: usize,
    closed: bool,
}

impl LocalResult {
    pub fn new(column_count: usize, rows: Vec<Row>) -> Self {
        Self {
            rows: Arc::new(rows),
            column_count,
            cursor: 0,
            closed: false,
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Advance the cursor; `None` once exhausted or closed
    pub fn next_row(&mut self) -> Option<&Row> {
        if self.closed {
            return None;
        }
        let row = self.rows.get(self.cursor)?;
        self.cursor += 1;
        Some(row)
    }

    /// Rewind to the first row
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Independent cursor over the same rows, positioned at the start.
    /// A closed result has no copy.
    pub fn shallow_copy(&self) -> Option<LocalResult> {
        if self.closed {
            return None;
        }
        Some(Self {
            rows: Arc::clone(&self.rows),
            column_count: self.column_count,
            cursor: 0,
            closed: false,
        })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Whether both results read the same row storage
    pub fn shares_rows_with(&self, other: &LocalResult) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample() -> LocalResult {
        LocalResult::new(1, vec![vec![Value::Int(1)], vec![Value::Int(2)]])
    }

    #[test]
    fn test_cursor() {
        let mut r = sample();
        assert_eq!(r.next_row(), Some(&vec![Value::Int(1)]));
        assert_eq!(r.next_row(), Some(&vec![Value::Int(2)]));
        assert_eq!(r.next_row(), None);
        r.reset();
        assert_eq!(r.next_row(), Some(&vec![Value::Int(1)]));
    }

    #[test]
    fn test_shallow_copy_is_independent() {
        let mut original = sample();
        original.next_row();

        let mut copy = original.shallow_copy().unwrap();
        assert!(copy.shares_rows_with(&original));
        assert_eq!(copy.next_row(), Some(&vec![Value::Int(1)]));

        copy.close();
        assert!(copy.is_closed());
        assert!(!original.is_closed());
        assert_eq!(original.next_row(), Some(&vec![Value::Int(2)]));
    }

    #[test]
    fn test_closed_has_no_copy() {
        let mut r = sample();
        r.close();
        assert!(r.shallow_copy().is_none());
        assert_eq!(r.next_row(), None);
    }
}
