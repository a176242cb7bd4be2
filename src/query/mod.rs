//! Query subsystem
//!
//! A `Query` is what every SELECT compiles into: either a simple select or
//! a union of two queries. It owns the attributes both shapes share
//! (LIMIT, OFFSET, SAMPLE_SIZE, DISTINCT, parameters) and a result cache.
//!
//! # Lifecycle
//!
//! 1. build the body, set ORDER BY / limit / parameters
//! 2. `init()` once: resolve ORDER BY, bind columns to own tables
//! 3. optionally `map_columns` from an enclosing query
//! 4. `execute` any number of times with different parameter values
//!
//! # Execute flow
//!
//! 1. every parameter must be bound
//! 2. before-select triggers fire, hit or miss
//! 3. the cache is consulted (see `cache`)
//! 4. on a miss the body computes without the cache and the result is
//!    stored only once computing succeeded

mod cache;
mod errors;
mod order;
mod select;
mod union;
mod window;

use std::sync::Arc;

use crate::engine::{ColumnResolver, Database, Session, Table, TableFilter};
use crate::executor::{LocalResult, ResultTarget, SortOrder};
use crate::expression::{CompareType, EvalContext, Expression, ExpressionVisitor, Parameter};
use crate::observability::{log_event_with_fields, Event};
use crate::value::Value;

pub use cache::{
    is_reusable, miss_reason, CacheKey, CacheState, CacheStats, Cacheability, Freshness, MissReason, ResultCache,
};
pub use errors::{QueryError, QueryResult};
pub use order::{init_order, prepare_order, SelectOrderBy};
pub use select::Select;
pub use union::{SelectUnion, UnionType};
pub use window::RowWindow;

/// The two query shapes
#[derive(Debug)]
pub enum QueryBody {
    Select(Select),
    Union(SelectUnion),
}

#[derive(Debug)]
pub struct Query {
    session: Arc<Session>,
    body: QueryBody,
    limit_expr: Option<Expression>,
    offset_expr: Option<Expression>,
    sample_size_expr: Option<Expression>,
    distinct: bool,
    random_access_result: bool,
    parameters: Vec<Arc<Parameter>>,
    cache: ResultCache,
    initialized: bool,
    prepared: bool,
}

impl Query {
    fn with_body(session: Arc<Session>, body: QueryBody) -> Self {
        Self {
            session,
            body,
            limit_expr: None,
            offset_expr: None,
            sample_size_expr: None,
            distinct: false,
            random_access_result: false,
            parameters: Vec::new(),
            cache: ResultCache::new(),
            initialized: false,
            prepared: false,
        }
    }

    pub fn select(session: Arc<Session>, select: Select) -> Self {
        Self::with_body(session, QueryBody::Select(select))
    }

    /// Both sides must belong to the same session
    pub fn union(session: Arc<Session>, union_type: UnionType, left: Query, right: Query) -> Self {
        Self::with_body(session, QueryBody::Union(SelectUnion::new(union_type, left, right)))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn body(&self) -> &QueryBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut QueryBody {
        &mut self.body
    }

    pub fn is_union(&self) -> bool {
        matches!(self.body, QueryBody::Union(_))
    }

    fn database(&self) -> Arc<Database> {
        Arc::clone(self.session.database())
    }

    // ==================
    // Lifecycle
    // ==================

    /// Resolve ORDER BY and bind columns. Calling it again is a no-op.
    pub fn init(&mut self) -> QueryResult<()> {
        if self.initialized {
            return Ok(());
        }
        let db = self.database();
        let distinct = self.distinct;
        match &mut self.body {
            QueryBody::Select(s) => s.init(&db, distinct)?,
            QueryBody::Union(u) => u.init(&db)?,
        }
        self.initialized = true;
        let columns = self.column_count().to_string();
        let expressions = self.expressions().len().to_string();
        log_event_with_fields(
            Event::QueryInit,
            &[
                ("kind", if self.is_union() { "union" } else { "select" }),
                ("columns", &columns),
                ("expressions", &expressions),
            ],
        );
        Ok(())
    }

    /// Validate bindings and build the sort specification. Runs once,
    /// implicitly on the first execute.
    pub fn prepare(&mut self) -> QueryResult<()> {
        if !self.initialized {
            return Err(QueryError::NotInitialized);
        }
        if self.prepared {
            return Ok(());
        }
        let db = self.database();
        match &mut self.body {
            QueryBody::Select(s) => s.prepare(&db)?,
            QueryBody::Union(u) => u.prepare(&db)?,
        }
        self.prepared = true;
        Ok(())
    }

    /// Run the query.
    ///
    /// `limit` is the caller's row cap (0 for none). With a `target`, rows
    /// are streamed into it, nothing is cached and `None` is returned.
    pub fn execute(&mut self, limit: usize, target: Option<&mut dyn ResultTarget>) -> QueryResult<Option<LocalResult>> {
        let db = self.database();
        let outcome = self.run(limit, target);
        match &outcome {
            Ok(_) => db.metrics().increment_queries_executed(),
            Err(e) => {
                if e.is_rejection() {
                    db.metrics().increment_queries_rejected();
                }
                let session = self.session.id().to_string();
                log_event_with_fields(
                    Event::QueryFailed,
                    &[("code", e.code()), ("error", &e.to_string()), ("session", &session)],
                );
            }
        }
        outcome
    }

    fn run(&mut self, limit: usize, target: Option<&mut dyn ResultTarget>) -> QueryResult<Option<LocalResult>> {
        self.prepare()?;
        if let Some(p) = self.all_parameters().into_iter().find(|p| !p.is_set()) {
            return Err(QueryError::ParameterNotSet(p.index() + 1));
        }
        self.fire_before_select_triggers();
        self.query_cached(limit, target)
    }

    /// Cache protocol around `query_without_cache`. Triggers are not
    /// fired here.
    pub(crate) fn query_cached(
        &mut self,
        limit: usize,
        target: Option<&mut dyn ResultTarget>,
    ) -> QueryResult<Option<LocalResult>> {
        let db = self.database();
        if let Some(target) = target {
            self.record_bypass(&db, "target");
            return self.query_without_cache(limit, Some(target));
        }
        if self.cache.is_disabled() || !db.optimize_reuse_results() {
            self.record_bypass(&db, "disabled");
            return self.query_without_cache(limit, None);
        }

        let key = CacheKey {
            limit,
            parameters: self.parameter_values(),
            modification_id: db.modification_data_id(),
        };
        let reason = self.try_reuse(&db, &key);
        let reason = match reason {
            Ok(hit) => {
                self.cache.record_hit();
                db.metrics().increment_cache_hits();
                log_event_with_fields(Event::QueryCacheHit, &[("session", &self.session.id().to_string())]);
                return Ok(Some(hit));
            }
            Err(reason) => reason,
        };

        self.cache.record_miss();
        db.metrics().increment_cache_misses();
        log_event_with_fields(Event::QueryCacheMiss, &[("reason", reason.as_str())]);

        self.cache.release();
        let result = self.query_without_cache(limit, None)?;
        Ok(result.map(|r| self.cache.store(key, r)))
    }

    /// A fresh copy of the cached result, or why there is none
    fn try_reuse(&mut self, db: &Database, key: &CacheKey) -> Result<LocalResult, MissReason> {
        if !self.is_everything(&mut ExpressionVisitor::deterministic()) {
            return Err(MissReason::NotDeterministic);
        }
        if !self.cache.has_candidate(key.limit) {
            return Err(MissReason::NoResult);
        }
        if self.cache.cacheability() == Cacheability::Unknown {
            let max = self.max_data_modification_id();
            if self.cache.settle(max) == Cacheability::NeverCacheable {
                log_event_with_fields(Event::QueryNeverCacheable, &[("session", &self.session.id().to_string())]);
                return Err(MissReason::NoResult);
            }
        }
        let freshness = Freshness {
            deterministic: true,
            independent: self.is_everything(&mut ExpressionVisitor::independent()),
            max_data_modification_id: self.max_data_modification_id(),
        };
        if let Some(reason) = miss_reason(self.cache.state(), key, &freshness, |a, b| db.are_equal(a, b)) {
            return Err(reason);
        }
        self.cache.reuse().ok_or(MissReason::NoResult)
    }

    fn record_bypass(&mut self, db: &Database, reason: &str) {
        self.cache.record_bypass();
        db.metrics().increment_cache_bypassed();
        log_event_with_fields(Event::QueryCacheBypass, &[("reason", reason)]);
    }

    fn query_without_cache(
        &mut self,
        max_rows: usize,
        target: Option<&mut dyn ResultTarget>,
    ) -> QueryResult<Option<LocalResult>> {
        let window = self.row_window(max_rows)?;
        let session = Arc::clone(&self.session);
        match &mut self.body {
            QueryBody::Select(s) => s.query_without_cache(&session, &window, target),
            QueryBody::Union(u) => u.query_without_cache(&session, &window, target),
        }
    }

    /// Evaluate LIMIT, OFFSET and SAMPLE_SIZE for one compute.
    ///
    /// The effective limit is the smaller of LIMIT and `max_rows`; a NULL
    /// or negative LIMIT and a zero `max_rows` mean unlimited.
    pub fn row_window(&self, max_rows: usize) -> QueryResult<RowWindow> {
        let ctx = EvalContext::constant(&self.session);
        let mut limit = match &self.limit_expr {
            Some(e) => {
                let v = e.evaluate(&ctx)?;
                if v.is_null() {
                    None
                } else {
                    usize::try_from(v.to_long()?).ok()
                }
            }
            None => None,
        };
        if max_rows != 0 {
            limit = Some(limit.map_or(max_rows, |l| l.min(max_rows)));
        }
        let offset = match &self.offset_expr {
            Some(e) => {
                let v = e.evaluate(&ctx)?;
                if v.is_null() {
                    0
                } else {
                    usize::try_from(v.to_long()?).unwrap_or(0)
                }
            }
            None => 0,
        };
        Ok(RowWindow {
            limit,
            offset,
            sample_size: self.sample_size_value()?,
            distinct: self.distinct,
        })
    }

    // ==================
    // Shape
    // ==================

    /// Replace the ORDER BY list. Must precede `init`.
    pub fn set_order(&mut self, order: Vec<SelectOrderBy>) {
        match &mut self.body {
            QueryBody::Select(s) => s.set_order(order),
            QueryBody::Union(u) => u.set_order(order),
        }
    }

    pub fn has_order(&self) -> bool {
        match &self.body {
            QueryBody::Select(s) => s.has_order(),
            QueryBody::Union(u) => u.has_order(),
        }
    }

    pub fn sort(&self) -> Option<&SortOrder> {
        match &self.body {
            QueryBody::Select(s) => s.sort(),
            QueryBody::Union(u) => u.sort(),
        }
    }

    pub fn order_list(&self) -> &[SelectOrderBy] {
        match &self.body {
            QueryBody::Select(s) => s.order_list(),
            QueryBody::Union(u) => u.order_list(),
        }
    }

    pub fn set_for_update(&mut self, for_update: bool) {
        match &mut self.body {
            QueryBody::Select(s) => s.set_for_update(for_update),
            QueryBody::Union(u) => u.set_for_update(for_update),
        }
    }

    /// Number of visible result columns
    pub fn column_count(&self) -> usize {
        match &self.body {
            QueryBody::Select(s) => s.visible_column_count(),
            QueryBody::Union(u) => u.expressions().len(),
        }
    }

    /// Select list, including hidden ORDER BY columns
    pub fn expressions(&self) -> &[Expression] {
        match &self.body {
            QueryBody::Select(s) => s.expressions(),
            QueryBody::Union(u) => u.expressions(),
        }
    }

    /// Every table read, each once
    pub fn tables(&self) -> Vec<Arc<Table>> {
        let all = match &self.body {
            QueryBody::Select(s) => s.tables(),
            QueryBody::Union(u) => u.tables(),
        };
        let mut tables: Vec<Arc<Table>> = Vec::with_capacity(all.len());
        for table in all {
            if !tables.iter().any(|t| Arc::ptr_eq(t, &table)) {
                tables.push(table);
            }
        }
        tables
    }

    /// Bind correlated columns to an enclosing query's table. `level` is
    /// the nesting depth of that query (1 for the direct parent).
    pub fn map_columns(&mut self, resolver: &dyn ColumnResolver, level: usize) -> QueryResult<()> {
        let db = self.database();
        match &mut self.body {
            QueryBody::Select(s) => s.map_columns(resolver, level, &db),
            QueryBody::Union(u) => u.map_columns(resolver, level),
        }
    }

    /// Mark whether `filter`'s current row can be read while evaluating
    pub fn set_evaluatable(&mut self, filter: &TableFilter, evaluatable: bool) {
        self.set_evaluatable_by_id(filter.id(), evaluatable);
    }

    pub(crate) fn set_evaluatable_by_id(&mut self, filter_id: u64, evaluatable: bool) {
        match &mut self.body {
            QueryBody::Select(s) => s.set_evaluatable(filter_id, evaluatable),
            QueryBody::Union(u) => u.set_evaluatable(filter_id, evaluatable),
        }
    }

    // ==================
    // Global conditions
    // ==================

    /// Whether a condition may be pushed into this query without changing
    /// which rows LIMIT / OFFSET select
    pub fn allow_global_conditions(&self) -> bool {
        let own = self.offset_expr.is_none() && (self.limit_expr.is_none() || !self.has_order());
        own && match &self.body {
            QueryBody::Select(_) => true,
            QueryBody::Union(u) => u.allow_global_conditions(),
        }
    }

    /// AND `column[column_id] <comparison> param` into the query and
    /// register `param`
    pub fn add_global_condition(
        &mut self,
        param: &Arc<Parameter>,
        column_id: usize,
        comparison: CompareType,
    ) -> QueryResult<()> {
        if !self.allow_global_conditions() {
            return Err(QueryError::GlobalConditionNotAllowed);
        }
        self.push_global_condition(param, column_id, comparison)
    }

    pub(crate) fn push_global_condition(
        &mut self,
        param: &Arc<Parameter>,
        column_id: usize,
        comparison: CompareType,
    ) -> QueryResult<()> {
        match &mut self.body {
            QueryBody::Select(s) => s.add_global_condition(param, column_id, comparison)?,
            QueryBody::Union(u) => u.add_global_condition(param, column_id, comparison)?,
        }
        self.add_parameter(Arc::clone(param));
        Ok(())
    }

    // ==================
    // Analysis
    // ==================

    /// Whether the body and the LIMIT / OFFSET / SAMPLE_SIZE expressions
    /// all satisfy `visitor`
    pub fn is_everything(&self, visitor: &mut ExpressionVisitor) -> bool {
        let body = match &self.body {
            QueryBody::Select(s) => s.is_everything(visitor),
            QueryBody::Union(u) => u.is_everything(visitor),
        };
        body && [&self.limit_expr, &self.offset_expr, &self.sample_size_expr]
            .into_iter()
            .flatten()
            .all(|e| e.is_everything(visitor))
    }

    pub fn is_deterministic(&self) -> bool {
        self.is_everything(&mut ExpressionVisitor::deterministic())
    }

    pub fn is_independent(&self) -> bool {
        self.is_everything(&mut ExpressionVisitor::independent())
    }

    /// Highest modification id of any referenced table or sequence;
    /// `u64::MAX` when one of them is not tracked
    pub fn max_data_modification_id(&self) -> u64 {
        let mut visitor = ExpressionVisitor::max_modification_id();
        self.is_everything(&mut visitor);
        visitor.max_data_modification_id()
    }

    pub fn cost(&self) -> f64 {
        match &self.body {
            QueryBody::Select(s) => s.cost(),
            QueryBody::Union(u) => u.cost(),
        }
    }

    /// Cost as a subquery, bounded to [10, 1_000_000]
    pub fn cost_as_expression(&self) -> i32 {
        scaled_cost(self.cost())
    }

    // ==================
    // Execution hooks
    // ==================

    pub fn update_aggregate(&mut self, ctx: &EvalContext<'_>) -> QueryResult<()> {
        match &mut self.body {
            QueryBody::Select(s) => s.update_aggregate(ctx),
            QueryBody::Union(u) => u.update_aggregate(ctx),
        }
    }

    pub fn fire_before_select_triggers(&self) {
        match &self.body {
            QueryBody::Select(s) => s.fire_before_select_triggers(&self.session),
            QueryBody::Union(u) => u.fire_before_select_triggers(),
        }
    }

    // ==================
    // Attributes
    // ==================

    pub fn add_parameter(&mut self, param: Arc<Parameter>) {
        self.parameters.push(param);
    }

    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    /// Current parameter values in declaration order, NULL when unbound.
    /// A union also lists the parameters of both sides.
    pub fn parameter_values(&self) -> Vec<Value> {
        self.all_parameters().iter().map(|p| p.param_value()).collect()
    }

    fn all_parameters(&self) -> Vec<Arc<Parameter>> {
        let mut all = self.parameters.clone();
        if let QueryBody::Union(u) = &self.body {
            all.extend(u.left().all_parameters());
            all.extend(u.right().all_parameters());
        }
        all
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn set_random_access_result(&mut self, random_access: bool) {
        self.random_access_result = random_access;
    }

    pub fn is_random_access_result(&self) -> bool {
        self.random_access_result
    }

    pub fn set_limit(&mut self, limit: Option<Expression>) {
        self.limit_expr = limit;
    }

    pub fn limit(&self) -> Option<&Expression> {
        self.limit_expr.as_ref()
    }

    pub fn set_offset(&mut self, offset: Option<Expression>) {
        self.offset_expr = offset;
    }

    pub fn offset(&self) -> Option<&Expression> {
        self.offset_expr.as_ref()
    }

    pub fn set_sample_size(&mut self, sample_size: Option<Expression>) {
        self.sample_size_expr = sample_size;
    }

    pub fn sample_size(&self) -> Option<&Expression> {
        self.sample_size_expr.as_ref()
    }

    /// SAMPLE_SIZE value; 0 when absent or NULL
    pub fn sample_size_value(&self) -> QueryResult<usize> {
        let Some(e) = &self.sample_size_expr else {
            return Ok(0);
        };
        let v = e.evaluate(&EvalContext::constant(&self.session))?;
        if v.is_null() {
            return Ok(0);
        }
        Ok(usize::try_from(v.to_int()?).unwrap_or(0))
    }

    /// Opt out of result reuse for the rest of this query's life
    pub fn disable_cache(&mut self) {
        self.cache.disable();
    }

    pub fn cacheability(&self) -> Cacheability {
        self.cache.cacheability()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Sort specification for `order_list` over `expression_count` columns
    pub fn prepare_order(&self, order_list: &[SelectOrderBy], expression_count: usize) -> QueryResult<SortOrder> {
        prepare_order(self.session.database(), order_list, expression_count)
    }
}

/// `10 + 10 * cost`, held within 10..=1_000_000
fn scaled_cost(cost: f64) -> i32 {
    let scaled = 10.0 + 10.0 * cost;
    if scaled.is_nan() {
        return 10;
    }
    scaled.clamp(10.0, 1_000_000.0) as i32
}
