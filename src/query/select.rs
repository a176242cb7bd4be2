//! Simple SELECT body
//!
//! Nested-loop cross product of the table filters, filtered by the WHERE
//! condition, projected onto the select list. A select list containing
//! aggregates collapses the whole input into one row.

use std::sync::Arc;

use crate::engine::{ColumnResolver, Database, Session, Table, TableFilter};
use crate::executor::{LocalResult, ResultTarget, SortOrder};
use crate::expression::{CompareType, EvalContext, Expression, ExpressionVisitor, Parameter, VisitorCriterion};
use crate::value::Row;

use super::errors::{QueryError, QueryResult};
use super::order::{init_order, prepare_order, SelectOrderBy};
use super::window::{deliver, RowWindow};

#[derive(Debug, Clone, Default)]
pub struct Select {
    filters: Vec<TableFilter>,
    expressions: Vec<Expression>,
    expression_sql: Vec<String>,
    visible_column_count: usize,
    condition: Option<Expression>,
    order_list: Vec<SelectOrderBy>,
    sort: Option<SortOrder>,
    is_for_update: bool,
    is_quick_aggregate: bool,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the FROM list
    pub fn add_table_filter(&mut self, mut filter: TableFilter) {
        filter.set_slot(self.filters.len());
        self.filters.push(filter);
    }

    pub fn add_expression(&mut self, expression: Expression) {
        self.expressions.push(expression);
    }

    pub fn set_condition(&mut self, condition: Expression) {
        self.condition = Some(condition);
    }

    /// AND `condition` into the WHERE clause
    pub fn add_condition(&mut self, condition: Expression) {
        self.condition = Some(match self.condition.take() {
            Some(existing) => Expression::and(existing, condition),
            None => condition,
        });
    }

    pub fn filters(&self) -> &[TableFilter] {
        &self.filters
    }

    pub fn condition(&self) -> Option<&Expression> {
        self.condition.as_ref()
    }

    pub fn order_list(&self) -> &[SelectOrderBy] {
        &self.order_list
    }

    pub fn sort(&self) -> Option<&SortOrder> {
        self.sort.as_ref()
    }

    pub fn is_quick_aggregate(&self) -> bool {
        self.is_quick_aggregate
    }

    pub(crate) fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub(crate) fn visible_column_count(&self) -> usize {
        self.visible_column_count
    }

    pub(crate) fn set_order(&mut self, order: Vec<SelectOrderBy>) {
        self.order_list = order;
    }

    pub(crate) fn has_order(&self) -> bool {
        !self.order_list.is_empty() || self.sort.is_some()
    }

    pub(crate) fn set_for_update(&mut self, for_update: bool) {
        self.is_for_update = for_update;
    }

    /// Resolve ORDER BY and bind columns to this select's own tables
    pub(crate) fn init(&mut self, db: &Database, distinct: bool) -> QueryResult<()> {
        self.visible_column_count = self.expressions.len();
        self.expression_sql = self
            .expressions
            .iter()
            .map(|e| e.non_alias_expression().sql())
            .collect();
        init_order(
            db,
            &mut self.expressions,
            Some(&mut self.expression_sql),
            &mut self.order_list,
            self.visible_column_count,
            distinct,
            Some(self.filters.as_slice()),
        )?;
        for filter in &self.filters {
            Self::map_all(
                &mut self.expressions,
                self.condition.as_mut(),
                &mut self.order_list,
                filter,
                0,
                db,
            )?;
        }
        Ok(())
    }

    /// Validate bindings and build the sort. Runs after any outer query
    /// had the chance to bind correlated columns.
    pub(crate) fn prepare(&mut self, db: &Database) -> QueryResult<()> {
        let unresolved = self
            .expressions
            .iter()
            .chain(self.condition.as_ref())
            .find_map(Expression::first_unresolved_column);
        if let Some(column) = unresolved {
            return Err(QueryError::ColumnNotFound(column));
        }
        self.is_quick_aggregate = self.expressions.iter().any(Expression::contains_aggregate);
        if !self.order_list.is_empty() {
            self.sort = Some(prepare_order(db, &self.order_list, self.expressions.len())?);
        }
        Ok(())
    }

    fn map_all(
        expressions: &mut [Expression],
        condition: Option<&mut Expression>,
        order_list: &mut [SelectOrderBy],
        resolver: &dyn ColumnResolver,
        level: usize,
        db: &Database,
    ) -> QueryResult<()> {
        for e in expressions.iter_mut() {
            e.map_columns(resolver, level, db)?;
        }
        if let Some(c) = condition {
            c.map_columns(resolver, level, db)?;
        }
        for o in order_list.iter_mut() {
            if let Some(e) = o.expression.as_mut() {
                e.map_columns(resolver, level, db)?;
            }
        }
        Ok(())
    }

    /// Bind columns to an enclosing query's resolver
    pub(crate) fn map_columns(&mut self, resolver: &dyn ColumnResolver, level: usize, db: &Database) -> QueryResult<()> {
        Self::map_all(
            &mut self.expressions,
            self.condition.as_mut(),
            &mut self.order_list,
            resolver,
            level,
            db,
        )
    }

    pub(crate) fn set_evaluatable(&mut self, filter_id: u64, evaluatable: bool) {
        for f in self.filters.iter_mut().filter(|f| f.id() == filter_id) {
            f.set_evaluatable(evaluatable);
        }
        for e in self.expressions.iter_mut().chain(self.condition.as_mut()) {
            e.set_evaluatable(filter_id, evaluatable);
        }
    }

    pub(crate) fn is_everything(&self, visitor: &mut ExpressionVisitor) -> bool {
        match visitor.criterion() {
            VisitorCriterion::Deterministic if self.is_for_update => return false,
            VisitorCriterion::MaxModificationId => {
                for f in &self.filters {
                    visitor.add_data_modification_id(f.table().max_data_modification_id());
                }
            }
            _ => {}
        }
        self.expressions
            .iter()
            .chain(self.condition.as_ref())
            .all(|e| e.is_everything(visitor))
    }

    pub(crate) fn tables(&self) -> Vec<Arc<Table>> {
        self.filters.iter().map(|f| Arc::clone(f.table())).collect()
    }

    /// AND `column <cmp> param` into the WHERE clause
    pub(crate) fn add_global_condition(
        &mut self,
        param: &Arc<Parameter>,
        column_id: usize,
        comparison: CompareType,
    ) -> QueryResult<()> {
        let column = self
            .expressions
            .get(column_id)
            .ok_or_else(|| QueryError::ColumnNotFound(format!("#{}", column_id + 1)))?
            .non_alias_expression()
            .clone();
        self.add_condition(Expression::compare(comparison, column, Expression::parameter(param)));
        Ok(())
    }

    pub(crate) fn update_aggregate(&mut self, ctx: &EvalContext<'_>) -> QueryResult<()> {
        for e in self.expressions.iter_mut().chain(self.condition.as_mut()) {
            e.update_aggregate(ctx)?;
        }
        Ok(())
    }

    pub(crate) fn fire_before_select_triggers(&self, session: &Session) {
        for f in &self.filters {
            f.table().fire_before_select(session);
        }
    }

    /// Product of the row counts of every table in the FROM list
    pub(crate) fn cost(&self) -> f64 {
        self.filters
            .iter()
            .map(|f| f.table().row_count().max(1) as f64)
            .product()
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
        let table_rows: Vec<Vec<Row>> = self.filters.iter().map(|f| f.table().rows()).collect();
        let mut rows: Vec<Row> = Vec::new();

        if self.is_quick_aggregate {
            for e in self.expressions.iter_mut() {
                e.reset_aggregates();
            }
        }
        let stop_at = if self.sort.is_none() && !self.is_quick_aggregate {
            window.early_stop()
        } else {
            None
        };

        let mut positions = vec![0usize; table_rows.len()];
        let mut scanned = 0usize;
        let has_rows = table_rows.iter().all(|r| !r.is_empty());
        while has_rows {
            if window.sample_size > 0 && scanned >= window.sample_size {
                break;
            }
            if stop_at.map_or(false, |n| rows.len() >= n) {
                break;
            }
            scanned += 1;

            let current: Vec<&Row> = positions
                .iter()
                .enumerate()
                .map(|(slot, &pos)| &table_rows[slot][pos])
                .collect();
            let ctx = EvalContext::new(session, &current);
            let accepted = match &self.condition {
                Some(c) => c.is_true(&ctx)?,
                None => true,
            };
            if accepted {
                if self.is_quick_aggregate {
                    for e in self.expressions.iter_mut() {
                        e.update_aggregate(&ctx)?;
                    }
                } else {
                    let row = self
                        .expressions
                        .iter()
                        .map(|e| e.evaluate(&ctx))
                        .collect::<QueryResult<Row>>()?;
                    rows.push(row);
                }
            }

            if !advance(&mut positions, &table_rows) {
                break;
            }
        }

        if self.is_quick_aggregate {
            let ctx = EvalContext::constant(session);
            let row = self
                .expressions
                .iter()
                .map(|e| e.evaluate(&ctx))
                .collect::<QueryResult<Row>>()?;
            rows.push(row);
        }

        let rows = window.finish(rows, self.sort.as_ref(), self.visible_column_count);
        session.database().metrics().add_rows_computed(rows.len() as u64);
        Ok(deliver(rows, self.visible_column_count, target))
    }
}

/// Step the nested-loop odometer; false once every combination was visited
fn advance(positions: &mut [usize], table_rows: &[Vec<Row>]) -> bool {
    for slot in (0..positions.len()).rev() {
        positions[slot] += 1;
        if positions[slot] < table_rows[slot].len() {
            return true;
        }
        positions[slot] = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_odometer() {
        let tables = vec![vec![vec![], vec![]], vec![vec![], vec![], vec![]]];
        let mut positions = vec![0, 0];
        let mut visited = 1;
        while advance(&mut positions, &tables) {
            visited += 1;
        }
        assert_eq!(visited, 6);
        assert_eq!(positions, vec![0, 0]);
    }

    #[test]
    fn test_no_tables_visits_once() {
        let mut positions: Vec<usize> = vec![];
        assert!(!advance(&mut positions, &[]));
    }

    #[test]
    fn test_add_condition_ands() {
        let mut select = Select::new();
        select.add_condition(Expression::value(true));
        select.add_condition(Expression::value(false));
        assert_eq!(select.condition().unwrap().sql(), "(TRUE AND FALSE)");
    }
}
