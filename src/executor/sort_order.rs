//! Multi-key sort specification over result rows
//!
//! One key per ORDER BY entry, in entry order. Each key names a column of
//! the (possibly extended) select list, a direction and a NULL ordering.
//! Sorting is stable: ties keep their input order.

use std::cmp::Ordering;

use crate::expression::Expression;
use crate::value::Row;

/// Where NULLs go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// Follows the database default and flips with the direction
    Default,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortType {
    pub descending: bool,
    pub nulls: NullOrdering,
}

impl SortType {
    pub const ASCENDING: i32 = 0;
    pub const DESCENDING: i32 = 1;
    pub const NULLS_FIRST: i32 = 2;
    pub const NULLS_LAST: i32 = 4;

    pub fn new(descending: bool, nulls: NullOrdering) -> Self {
        Self { descending, nulls }
    }

    pub fn ascending() -> Self {
        Self::new(false, NullOrdering::Default)
    }

    pub fn descending() -> Self {
        Self::new(true, NullOrdering::Default)
    }

    /// Direction and NULL ordering combined into one code
    pub fn code(&self) -> i32 {
        let direction = if self.descending { Self::DESCENDING } else { Self::ASCENDING };
        direction
            + match self.nulls {
                NullOrdering::Default => 0,
                NullOrdering::First => Self::NULLS_FIRST,
                NullOrdering::Last => Self::NULLS_LAST,
            }
    }

    pub fn from_code(code: i32) -> Self {
        let nulls = if code & Self::NULLS_FIRST != 0 {
            NullOrdering::First
        } else if code & Self::NULLS_LAST != 0 {
            NullOrdering::Last
        } else {
            NullOrdering::Default
        };
        Self::new(code & Self::DESCENDING != 0, nulls)
    }

    /// Ordering of a NULL against a non-NULL. `a_null` tells which side
    /// holds the NULL.
    fn compare_null(&self, a_null: bool, nulls_high: bool) -> Ordering {
        let a_first = match self.nulls {
            NullOrdering::First => a_null,
            NullOrdering::Last => !a_null,
            NullOrdering::Default => {
                // NULL low ascending means NULL first; descending flips it
                (a_null != nulls_high) != self.descending
            }
        };
        if a_first {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    indexes: Vec<usize>,
    sort_types: Vec<SortType>,
    nulls_high: bool,
}

impl SortOrder {
    pub fn new(indexes: Vec<usize>, sort_types: Vec<SortType>, nulls_high: bool) -> Self {
        debug_assert_eq!(indexes.len(), sort_types.len());
        Self {
            indexes,
            sort_types,
            nulls_high,
        }
    }

    /// Zero-based column indexes, one per key
    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }

    pub fn sort_types(&self) -> &[SortType] {
        &self.sort_types
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for (&idx, sort_type) in self.indexes.iter().zip(&self.sort_types) {
            let (va, vb) = match (a.get(idx), b.get(idx)) {
                (Some(va), Some(vb)) => (va, vb),
                _ => continue,
            };
            let (a_null, b_null) = (va.is_null(), vb.is_null());
            if a_null || b_null {
                if a_null == b_null {
                    continue;
                }
                return sort_type.compare_null(a_null, self.nulls_high);
            }
            let ordering = va.compare_to(vb);
            if ordering != Ordering::Equal {
                return if sort_type.descending { ordering.reverse() } else { ordering };
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort
    pub fn sort(&self, rows: &mut [Row]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }

    /// ORDER BY text. Visible columns render as 1-based ordinals, hidden
    /// ones as their expression.
    pub fn sql(&self, expressions: &[Expression], visible: usize) -> String {
        let keys: Vec<String> = self
            .indexes
            .iter()
            .zip(&self.sort_types)
            .map(|(&idx, sort_type)| {
                let mut key = if idx < visible {
                    (idx + 1).to_string()
                } else {
                    expressions
                        .get(idx)
                        .map(|e| e.non_alias_expression().sql())
                        .unwrap_or_else(|| (idx + 1).to_string())
                };
                if sort_type.descending {
                    key.push_str(" DESC");
                }
                match sort_type.nulls {
                    NullOrdering::First => key.push_str(" NULLS FIRST"),
                    NullOrdering::Last => key.push_str(" NULLS LAST"),
                    NullOrdering::Default => {}
                }
                key
            })
            .collect();
        keys.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn rows(values: &[Option<i32>]) -> Vec<Row> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| vec![v.map_or(Value::Null, Value::Int), Value::Int(i as i32)])
            .collect()
    }

    fn firsts(rows: &[Row]) -> Vec<Value> {
        rows.iter().map(|r| r[0].clone()).collect()
    }

    #[test]
    fn test_codes() {
        assert_eq!(SortType::ascending().code(), 0);
        assert_eq!(SortType::descending().code(), 1);
        assert_eq!(SortType::new(true, NullOrdering::First).code(), 3);
        assert_eq!(SortType::new(false, NullOrdering::Last).code(), 4);
        assert_eq!(SortType::from_code(5), SortType::new(true, NullOrdering::Last));
    }

    #[test]
    fn test_default_nulls_low() {
        let mut data = rows(&[Some(2), None, Some(1)]);
        SortOrder::new(vec![0], vec![SortType::ascending()], false).sort(&mut data);
        assert_eq!(firsts(&data), vec![Value::Null, Value::Int(1), Value::Int(2)]);

        SortOrder::new(vec![0], vec![SortType::descending()], false).sort(&mut data);
        assert_eq!(firsts(&data), vec![Value::Int(2), Value::Int(1), Value::Null]);
    }

    #[test]
    fn test_default_nulls_high() {
        let mut data = rows(&[Some(2), None, Some(1)]);
        SortOrder::new(vec![0], vec![SortType::ascending()], true).sort(&mut data);
        assert_eq!(firsts(&data), vec![Value::Int(1), Value::Int(2), Value::Null]);
    }

    #[test]
    fn test_explicit_nulls_ignore_direction() {
        let mut data = rows(&[Some(2), None, Some(1)]);
        SortOrder::new(vec![0], vec![SortType::new(true, NullOrdering::First)], false).sort(&mut data);
        assert_eq!(firsts(&data), vec![Value::Null, Value::Int(2), Value::Int(1)]);

        SortOrder::new(vec![0], vec![SortType::new(false, NullOrdering::Last)], false).sort(&mut data);
        assert_eq!(firsts(&data), vec![Value::Int(1), Value::Int(2), Value::Null]);
    }

    #[test]
    fn test_secondary_key_and_stability() {
        let mut data = vec![
            vec![Value::Int(1), Value::from("b"), Value::Int(0)],
            vec![Value::Int(0), Value::from("z"), Value::Int(1)],
            vec![Value::Int(1), Value::from("a"), Value::Int(2)],
            vec![Value::Int(1), Value::from("a"), Value::Int(3)],
        ];
        let order = SortOrder::new(vec![0, 1], vec![SortType::descending(), SortType::ascending()], false);
        order.sort(&mut data);
        let tags: Vec<Value> = data.iter().map(|r| r[2].clone()).collect();
        assert_eq!(tags, vec![Value::Int(2), Value::Int(3), Value::Int(0), Value::Int(1)]);
    }

    #[test]
    fn test_sql() {
        let exprs = vec![Expression::column("A"), Expression::column("B")];
        let order = SortOrder::new(
            vec![0, 1],
            vec![SortType::descending(), SortType::new(false, NullOrdering::First)],
            false,
        );
        assert_eq!(order.sql(&exprs, 1), "1 DESC, B NULLS FIRST");
    }
}
