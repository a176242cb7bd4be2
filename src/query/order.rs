//! ORDER BY resolution
//!
//! Two passes:
//!
//! 1. `init_order` matches each ORDER BY expression against the select
//!    list (column names, aliases, qualified names, SQL text) and rewrites
//!    the entry into a 1-based column ordinal, appending a hidden column
//!    when nothing matches and that is allowed.
//! 2. `prepare_order` turns the ordinals into a `SortOrder`. A negative
//!    ordinal (legacy `ORDER BY -1`) reverses the direction.

use crate::engine::{Database, TableFilter};
use crate::executor::{NullOrdering, SortOrder, SortType};
use crate::expression::Expression;
use crate::observability::{log_event_with_fields, Event};
use crate::value::Value;

use super::errors::{QueryError, QueryResult};

/// One ORDER BY entry
#[derive(Debug, Clone)]
pub struct SelectOrderBy {
    /// Expression to sort by; `None` for a bare ordinal
    pub expression: Option<Expression>,
    /// 1-based select list position, possibly negative or a parameter
    pub column_index_expr: Option<Expression>,
    pub descending: bool,
    pub nulls_first: bool,
    pub nulls_last: bool,
}

impl SelectOrderBy {
    /// `ORDER BY <n>`
    pub fn ordinal(index: i32) -> Self {
        Self::from_index_expr(Expression::value(index))
    }

    /// `ORDER BY ?` with the ordinal bound later
    pub fn ordinal_expr(index: Expression) -> Self {
        Self::from_index_expr(index)
    }

    /// The ordinal comes from a parameter and can change between runs
    pub fn has_parameter_ordinal(&self) -> bool {
        matches!(self.column_index_expr, Some(Expression::Parameter(_)))
    }

    fn from_index_expr(index: Expression) -> Self {
        Self {
            expression: None,
            column_index_expr: Some(index),
            descending: false,
            nulls_first: false,
            nulls_last: false,
        }
    }

    /// `ORDER BY <expr>`
    pub fn expression(expression: Expression) -> Self {
        Self {
            expression: Some(expression),
            column_index_expr: None,
            descending: false,
            nulls_first: false,
            nulls_last: false,
        }
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls_first = true;
        self.nulls_last = false;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self.nulls_first = false;
        self
    }

    pub fn sql(&self) -> String {
        let mut sql = match (&self.expression, &self.column_index_expr) {
            (Some(e), _) => e.sql(),
            (None, Some(idx)) => idx.sql(),
            (None, None) => String::new(),
        };
        if self.descending {
            sql.push_str(" DESC");
        }
        if self.nulls_first {
            sql.push_str(" NULLS FIRST");
        } else if self.nulls_last {
            sql.push_str(" NULLS LAST");
        }
        sql
    }
}

/// Resolve every ORDER BY expression to a select list position.
///
/// `expressions` may grow: unmatched entries are appended as hidden
/// columns unless `must_be_in_result`. Only the first `visible` entries
/// are considered for column matches; SQL text matches consider every
/// entry of `expression_sql`, including columns appended earlier in the
/// same pass.
pub fn init_order(
    db: &Database,
    expressions: &mut Vec<Expression>,
    mut expression_sql: Option<&mut Vec<String>>,
    order_list: &mut [SelectOrderBy],
    visible: usize,
    must_be_in_result: bool,
    filters: Option<&[TableFilter]>,
) -> QueryResult<()> {
    for o in order_list.iter_mut() {
        let e = match &o.expression {
            Some(e) => e,
            None => continue,
        };
        let matched = match e.as_column() {
            Some(order_col) => match_column(db, order_col, expressions, visible, filters),
            None => {
                let sql = e.sql();
                expression_sql
                    .as_deref()
                    .and_then(|sqls| sqls.iter().position(|s| db.equals_identifiers(s, &sql)))
            }
        };
        let idx = match matched {
            Some(idx) => idx,
            None => {
                let sql = e.sql();
                if must_be_in_result {
                    log_event_with_fields(Event::OrderByRejected, &[("sql", &sql)]);
                    return Err(QueryError::OrderByNotInResult(sql));
                }
                expressions.push(e.clone());
                if let Some(sqls) = expression_sql.as_deref_mut() {
                    sqls.push(sql);
                }
                expressions.len() - 1
            }
        };
        o.column_index_expr = Some(Expression::Value(Value::Int(ordinal(idx)?)));
        o.expression = Some(expressions[idx].non_alias_expression().clone());
    }
    Ok(())
}

fn ordinal(idx: usize) -> QueryResult<i32> {
    i32::try_from(idx + 1).map_err(|_| QueryError::NumericOverflow(format!("ORDER BY position {}", idx + 1)))
}

/// First visible select entry a column reference sorts by
fn match_column(
    db: &Database,
    order_col: &crate::expression::ExpressionColumn,
    expressions: &[Expression],
    visible: usize,
    filters: Option<&[TableFilter]>,
) -> Option<usize> {
    let table_alias = order_col.table_alias();
    let col = order_col.column_name();
    for (j, ec) in expressions.iter().enumerate().take(visible) {
        let found = if let Some(c) = ec.as_column() {
            let mut found = db.equals_identifiers(col, c.column_name());
            if found {
                if let Some(ta) = table_alias {
                    found = match c.table_alias() {
                        Some(ca) => db.equals_identifiers(ca, ta),
                        // select id from test order by test.id
                        None => filters.map_or(false, |fs| fs.iter().any(|f| db.equals_identifiers(f.alias(), ta))),
                    };
                }
            }
            found
        } else if !ec.is_alias() {
            continue;
        } else if table_alias.is_none() && db.equals_identifiers(col, &ec.alias()) {
            true
        } else if let Some(c2) = ec.non_alias_expression().as_column() {
            db.equals_identifiers(col, c2.column_name()) && db.equals_identifiers(&order_col.sql(), &c2.sql())
        } else {
            false
        };
        if found {
            return Some(j);
        }
    }
    None
}

/// Build the sort specification from resolved entries.
///
/// A NULL ordinal (an unbound parameter) sorts by the first column.
pub fn prepare_order(db: &Database, order_list: &[SelectOrderBy], expression_count: usize) -> QueryResult<SortOrder> {
    let mut indexes = Vec::with_capacity(order_list.len());
    let mut sort_types = Vec::with_capacity(order_list.len());
    for o in order_list {
        let index_expr = o
            .column_index_expr
            .as_ref()
            .ok_or_else(|| QueryError::InvalidValue(format!("ORDER BY {} is not resolved", o.sql())))?;
        let value = index_expr.constant_value()?;
        let (idx, reverse) = if value.is_null() {
            (0, false)
        } else {
            let raw = i64::from(value.to_int()?);
            let reverse = raw < 0;
            let idx = raw.abs() - 1;
            if idx < 0 || idx >= expression_count as i64 {
                let attempted = (idx + 1).to_string();
                log_event_with_fields(Event::OrderByRejected, &[("ordinal", &attempted)]);
                return Err(QueryError::OrderByNotInResult(attempted));
            }
            (idx as usize, reverse)
        };
        let nulls = if o.nulls_first {
            NullOrdering::First
        } else if o.nulls_last {
            NullOrdering::Last
        } else {
            NullOrdering::Default
        };
        indexes.push(idx);
        sort_types.push(SortType::new(o.descending != reverse, nulls));
    }
    Ok(SortOrder::new(indexes, sort_types, db.settings().sort_nulls_high))
}
