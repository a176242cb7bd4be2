//! Post-processing of computed rows: DISTINCT, ORDER BY, OFFSET, LIMIT

use std::collections::HashSet;

use crate::executor::{LocalResult, ResultTarget, SortOrder};
use crate::value::Row;

/// Row bounds evaluated for one compute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowWindow {
    /// `None` means unlimited
    pub limit: Option<usize>,
    pub offset: usize,
    /// Maximum candidate rows to scan; 0 means unbounded
    pub sample_size: usize,
    pub distinct: bool,
}

impl RowWindow {
    /// Rows needed before anything can be dropped, when rows arrive
    /// already in output order
    pub fn early_stop(&self) -> Option<usize> {
        if self.distinct {
            return None;
        }
        self.limit.map(|limit| limit.saturating_add(self.offset))
    }

    /// Apply distinct, sort, offset and limit, then cut hidden columns
    pub fn finish(&self, mut rows: Vec<Row>, sort: Option<&SortOrder>, visible: usize) -> Vec<Row> {
        if self.distinct {
            let mut seen = HashSet::new();
            rows.retain(|row| seen.insert(row.clone()));
        }
        if let Some(sort) = sort {
            sort.sort(&mut rows);
        }
        let offset = self.offset.min(rows.len());
        rows.drain(..offset);
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        for row in rows.iter_mut() {
            row.truncate(visible);
        }
        rows
    }
}

/// Hand rows to the target, or wrap them in a result
pub(crate) fn deliver(rows: Vec<Row>, visible: usize, target: Option<&mut dyn ResultTarget>) -> Option<LocalResult> {
    match target {
        Some(target) => {
            for row in rows {
                target.add_row(row);
            }
            None
        }
        None => Some(LocalResult::new(visible, rows)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SortType;
    use crate::value::Value;

    fn rows(values: &[i32]) -> Vec<Row> {
        values.iter().map(|&v| vec![Value::Int(v), Value::Int(-v)]).collect()
    }

    #[test]
    fn test_offset_then_limit() {
        let window = RowWindow {
            limit: Some(2),
            offset: 1,
            ..RowWindow::default()
        };
        let out = window.finish(rows(&[1, 2, 3, 4]), None, 2);
        assert_eq!(out, rows(&[2, 3]));
    }

    #[test]
    fn test_offset_past_end() {
        let window = RowWindow {
            offset: 10,
            ..RowWindow::default()
        };
        assert!(window.finish(rows(&[1, 2]), None, 2).is_empty());
    }

    #[test]
    fn test_distinct_sort_and_hidden_columns() {
        let window = RowWindow {
            distinct: true,
            ..RowWindow::default()
        };
        let sort = SortOrder::new(vec![0], vec![SortType::descending()], false);
        let out = window.finish(rows(&[1, 3, 1, 2]), Some(&sort), 1);
        assert_eq!(out, vec![vec![Value::Int(3)], vec![Value::Int(2)], vec![Value::Int(1)]]);
    }

    #[test]
    fn test_early_stop() {
        let window = RowWindow {
            limit: Some(3),
            offset: 2,
            ..RowWindow::default()
        };
        assert_eq!(window.early_stop(), Some(5));
        assert_eq!(RowWindow::default().early_stop(), None);
    }

    #[test]
    fn test_deliver_to_target() {
        let mut sink: Vec<Row> = Vec::new();
        assert!(deliver(rows(&[1]), 2, Some(&mut sink)).is_none());
        assert_eq!(sink.row_count(), 1);
        assert_eq!(deliver(rows(&[1, 2]), 2, None).unwrap().row_count(), 2);
    }
}
