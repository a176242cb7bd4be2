//! UNION / UNION ALL / EXCEPT / INTERSECT of two queries

use std::collections::HashSet;
use std::sync::Arc;

use crate::engine::{ColumnResolver, Database, Session, Table};
use crate::executor::{LocalResult, ResultTarget, SortOrder};
use crate::expression::{CompareType, EvalContext, Expression, ExpressionVisitor, Parameter};
use crate::value::Row;

use super::errors::{QueryError, QueryResult};
use super::order::{init_order, prepare_order, SelectOrderBy};
use super::window::{deliver, RowWindow};
use super::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionType {
    Union,
    UnionAll,
    Except,
    Intersect,
}

impl UnionType {
    pub fn keyword(&self) -> &'static str {
        match self {
            UnionType::Union => "UNION",
            UnionType::UnionAll => "UNION ALL",
            UnionType::Except => "EXCEPT",
            UnionType::Intersect => "INTERSECT",
        }
    }
}

#[derive(Debug)]
pub struct SelectUnion {
    union_type: UnionType,
    left: Box<Query>,
    right: Box<Query>,
    expressions: Vec<Expression>,
    order_list: Vec<SelectOrderBy>,
    sort: Option<SortOrder>,
}

impl SelectUnion {
    pub fn new(union_type: UnionType, left: Query, right: Query) -> Self {
        Self {
            union_type,
            left: Box::new(left),
            right: Box::new(right),
            expressions: Vec::new(),
            order_list: Vec::new(),
            sort: None,
        }
    }

    pub fn union_type(&self) -> UnionType {
        self.union_type
    }

    pub fn left(&self) -> &Query {
        &self.left
    }

    pub fn right(&self) -> &Query {
        &self.right
    }

    pub fn left_mut(&mut self) -> &mut Query {
        &mut self.left
    }

    pub fn right_mut(&mut self) -> &mut Query {
        &mut self.right
    }

    pub fn order_list(&self) -> &[SelectOrderBy] {
        &self.order_list
    }

    pub fn sort(&self) -> Option<&SortOrder> {
        self.sort.as_ref()
    }

    pub(crate) fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub(crate) fn set_order(&mut self, order: Vec<SelectOrderBy>) {
        self.order_list = order;
    }

    pub(crate) fn has_order(&self) -> bool {
        !self.order_list.is_empty() || self.sort.is_some()
    }

    pub(crate) fn set_for_update(&mut self, for_update: bool) {
        self.left.set_for_update(for_update);
        self.right.set_for_update(for_update);
    }

    /// Initialize both sides, then resolve ORDER BY against the left
    /// side's visible columns. Every ORDER BY entry must be in the result.
    pub(crate) fn init(&mut self, db: &Database) -> QueryResult<()> {
        self.left.init()?;
        self.right.init()?;
        let (left_count, right_count) = (self.left.column_count(), self.right.column_count());
        if left_count != right_count {
            return Err(QueryError::ColumnCountMismatch(left_count, right_count));
        }
        self.expressions = self.left.expressions()[..left_count].to_vec();
        init_order(db, &mut self.expressions, None, &mut self.order_list, left_count, true, None)
    }

    pub(crate) fn prepare(&mut self, db: &Database) -> QueryResult<()> {
        self.left.prepare()?;
        self.right.prepare()?;
        if !self.order_list.is_empty() {
            self.sort = Some(prepare_order(db, &self.order_list, self.expressions.len())?);
        }
        Ok(())
    }

    pub(crate) fn map_columns(&mut self, resolver: &dyn ColumnResolver, level: usize) -> QueryResult<()> {
        self.left.map_columns(resolver, level)?;
        self.right.map_columns(resolver, level)
    }

    pub(crate) fn set_evaluatable(&mut self, filter_id: u64, evaluatable: bool) {
        self.left.set_evaluatable_by_id(filter_id, evaluatable);
        self.right.set_evaluatable_by_id(filter_id, evaluatable);
    }

    pub(crate) fn is_everything(&self, visitor: &mut ExpressionVisitor) -> bool {
        self.left.is_everything(visitor) && self.right.is_everything(visitor)
    }

    pub(crate) fn allow_global_conditions(&self) -> bool {
        self.left.allow_global_conditions() && self.right.allow_global_conditions()
    }

    pub(crate) fn tables(&self) -> Vec<Arc<Table>> {
        let mut tables = self.left.tables();
        tables.extend(self.right.tables());
        tables
    }

    /// EXCEPT only restricts its left side: filtering the right side could
    /// let rows through that it should remove.
    pub(crate) fn add_global_condition(
        &mut self,
        param: &Arc<Parameter>,
        column_id: usize,
        comparison: CompareType,
    ) -> QueryResult<()> {
        self.left.push_global_condition(param, column_id, comparison)?;
        if self.union_type != UnionType::Except {
            self.right.push_global_condition(param, column_id, comparison)?;
        }
        Ok(())
    }

    pub(crate) fn update_aggregate(&mut self, ctx: &EvalContext<'_>) -> QueryResult<()> {
        self.left.update_aggregate(ctx)?;
        self.right.update_aggregate(ctx)
    }

    pub(crate) fn fire_before_select_triggers(&self) {
        self.left.fire_before_select_triggers();
        self.right.fire_before_select_triggers();
    }

    pub(crate) fn cost(&self) -> f64 {
        self.left.cost() + self.right.cost()
    }

    pub(crate) fn query_without_cache(
        &mut self,
        session: &Session,
        window: &RowWindow,
        target: Option<&mut dyn ResultTarget>,
    ) -> QueryResult<Option<LocalResult>> {
        if self.order_list.iter().any(SelectOrderBy::has_parameter_ordinal) {
            self.sort = Some(prepare_order(session.database(), &self.order_list, self.expressions.len())?);
        }
        let left = child_rows(&mut self.left)?;
        let right = child_rows(&mut self.right)?;

        let rows = match self.union_type {
            UnionType::UnionAll => {
                let mut rows = left;
                rows.extend(right);
                rows
            }
            UnionType::Union => {
                let mut seen = HashSet::new();
                left.into_iter()
                    .chain(right)
                    .filter(|row| seen.insert(row.clone()))
                    .collect()
            }
            UnionType::Except => {
                let removed: HashSet<Row> = right.into_iter().collect();
                let mut seen = HashSet::new();
                left.into_iter()
                    .filter(|row| !removed.contains(row) && seen.insert(row.clone()))
                    .collect()
            }
            UnionType::Intersect => {
                let kept: HashSet<Row> = right.into_iter().collect();
                let mut seen = HashSet::new();
                left.into_iter()
                    .filter(|row| kept.contains(row) && seen.insert(row.clone()))
                    .collect()
            }
        };

        let column_count = self.expressions.len();
        let rows = window.finish(rows, self.sort.as_ref(), column_count);
        session.database().metrics().add_rows_computed(rows.len() as u64);
        Ok(deliver(rows, column_count, target))
    }
}

/// Rows of one side, through that side's own cache
fn child_rows(query: &mut Query) -> QueryResult<Vec<Row>> {
    Ok(query
        .query_cached(0, None)?
        .map(|result| result.rows().to_vec())
        .unwrap_or_default())
}
