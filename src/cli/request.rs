//! Query requests
//!
//! A request describes a query tree as JSON plus the executions to run
//! against it:
//!
//! ```json
//! {
//!   "select": [{"expr": {"column": "NAME"}, "alias": "N"}],
//!   "from": [{"table": "USERS", "alias": "U"}],
//!   "where": {"op": ">", "args": [{"column": "ID"}, {"param": 1}]},
//!   "order_by": [{"expr": {"column": "NAME"}, "desc": true}],
//!   "limit": 10,
//!   "executions": [{"params": [2]}, {"params": [2]}]
//! }
//! ```
//!
//! A union replaces `select` / `from` / `where` with
//! `"union": "UNION ALL", "left": {...}, "right": {...}`.

use std::sync::Arc;

use serde::Deserialize;

use crate::engine::{Session, TableFilter};
use crate::expression::{AggregateKind, CompareType, Expression, FunctionKind, OpType, Parameter};
use crate::query::{Query, QueryBody, Select, SelectOrderBy, UnionType};
use crate::value::Value;

use super::errors::{CliError, CliResult};

/// An expression. Untagged: the keys present pick the variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExprSpec {
    Column {
        column: String,
        #[serde(default)]
        table: Option<String>,
    },
    Param {
        /// 1-based
        param: usize,
    },
    Op {
        op: String,
        args: Vec<ExprSpec>,
    },
    Function {
        function: String,
        #[serde(default)]
        args: Vec<ExprSpec>,
    },
    Aggregate {
        aggregate: String,
        #[serde(default)]
        arg: Option<Box<ExprSpec>>,
    },
    NextValue {
        next_value: String,
    },
    Literal(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectItem {
    pub expr: ExprSpec,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FromItem {
    pub table: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// One ORDER BY entry: either `ordinal` (constant or parameter) or `expr`
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub ordinal: Option<ExprSpec>,
    #[serde(default)]
    pub expr: Option<ExprSpec>,
    #[serde(default)]
    pub desc: bool,
    #[serde(default)]
    pub nulls_first: bool,
    #[serde(default)]
    pub nulls_last: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertSpec {
    pub table: String,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// One execute call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionSpec {
    /// Values for parameters 1..n
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    /// Caller row cap; 0 for none
    #[serde(default)]
    pub max_rows: usize,
    /// Rows inserted before this execution
    #[serde(default)]
    pub insert: Vec<InsertSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub select: Vec<SelectItem>,
    #[serde(default)]
    pub from: Vec<FromItem>,
    #[serde(default, rename = "where")]
    pub condition: Option<ExprSpec>,

    #[serde(default)]
    pub union: Option<String>,
    #[serde(default)]
    pub left: Option<Box<QueryRequest>>,
    #[serde(default)]
    pub right: Option<Box<QueryRequest>>,

    #[serde(default)]
    pub order_by: Vec<OrderItem>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub for_update: bool,
    #[serde(default)]
    pub limit: Option<ExprSpec>,
    #[serde(default)]
    pub offset: Option<ExprSpec>,
    #[serde(default)]
    pub sample_size: Option<ExprSpec>,

    /// Executions for the `query` command; one plain execution when empty
    #[serde(default)]
    pub executions: Vec<ExecutionSpec>,
}

impl QueryRequest {
    pub fn from_json(json: serde_json::Value) -> CliResult<Self> {
        serde_json::from_value(json).map_err(|e| CliError::query_error(format!("Invalid request: {}", e)))
    }

    /// Executions to run, never empty
    pub fn executions(&self) -> Vec<ExecutionSpec> {
        if self.executions.is_empty() {
            vec![ExecutionSpec::default()]
        } else {
            self.executions.clone()
        }
    }
}

/// Builds a query tree for one session. Parameters are shared by index
/// across the whole tree.
pub struct QueryBuilder {
    session: Arc<Session>,
    parameters: Vec<Arc<Parameter>>,
}

impl QueryBuilder {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            parameters: Vec::new(),
        }
    }

    /// Build and initialize the query
    pub fn build(mut self, request: &QueryRequest) -> CliResult<Query> {
        let mut query = self.build_query(request)?;
        register_parameters(&mut query, &self.parameters);
        query.init()?;
        Ok(query)
    }

    fn build_query(&mut self, request: &QueryRequest) -> CliResult<Query> {
        let mut query = match &request.union {
            Some(keyword) => {
                let union_type = parse_union_type(keyword)?;
                let (left, right) = match (&request.left, &request.right) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return Err(CliError::query_error("union requires left and right")),
                };
                let left = self.build_query(left)?;
                let right = self.build_query(right)?;
                Query::union(Arc::clone(&self.session), union_type, left, right)
            }
            None => Query::select(Arc::clone(&self.session), self.build_select(request)?),
        };

        let order = request
            .order_by
            .iter()
            .map(|item| self.order_item(item))
            .collect::<CliResult<Vec<_>>>()?;
        query.set_order(order);
        query.set_distinct(request.distinct);
        query.set_for_update(request.for_update);
        query.set_limit(self.optional_expr(request.limit.as_ref())?);
        query.set_offset(self.optional_expr(request.offset.as_ref())?);
        query.set_sample_size(self.optional_expr(request.sample_size.as_ref())?);
        Ok(query)
    }

    fn build_select(&mut self, request: &QueryRequest) -> CliResult<Select> {
        if request.select.is_empty() {
            return Err(CliError::query_error("select list is empty"));
        }
        let db = Arc::clone(self.session.database());
        let mut select = Select::new();
        for item in &request.from {
            let table = db
                .find_table(&item.table)
                .ok_or_else(|| CliError::query_error(format!("Table {} not found", item.table)))?;
            select.add_table_filter(TableFilter::new(table, item.alias.as_deref()));
        }
        for item in &request.select {
            let expr = self.expr(&item.expr)?;
            select.add_expression(match &item.alias {
                Some(alias) => Expression::aliased(expr, alias),
                None => expr,
            });
        }
        if let Some(condition) = &request.condition {
            select.set_condition(self.expr(condition)?);
        }
        Ok(select)
    }

    fn order_item(&mut self, item: &OrderItem) -> CliResult<SelectOrderBy> {
        let mut order = match (&item.ordinal, &item.expr) {
            (Some(ordinal), None) => SelectOrderBy::ordinal_expr(self.expr(ordinal)?),
            (None, Some(expr)) => SelectOrderBy::expression(self.expr(expr)?),
            _ => return Err(CliError::query_error("order_by entry needs exactly one of ordinal, expr")),
        };
        if item.desc {
            order = order.descending();
        }
        if item.nulls_first {
            order = order.nulls_first();
        }
        if item.nulls_last {
            order = order.nulls_last();
        }
        Ok(order)
    }

    fn optional_expr(&mut self, spec: Option<&ExprSpec>) -> CliResult<Option<Expression>> {
        spec.map(|s| self.expr(s)).transpose()
    }

    fn parameter(&mut self, index: usize) -> CliResult<Arc<Parameter>> {
        if index == 0 {
            return Err(CliError::query_error("parameter indexes are 1-based"));
        }
        while self.parameters.len() < index {
            self.parameters.push(Parameter::new(self.parameters.len()));
        }
        Ok(Arc::clone(&self.parameters[index - 1]))
    }

    fn expr(&mut self, spec: &ExprSpec) -> CliResult<Expression> {
        let expr = match spec {
            ExprSpec::Literal(json) => Expression::value(Value::from_json(json)?),
            ExprSpec::Column { column, table } => match table {
                Some(t) => Expression::qualified_column(t, column),
                None => Expression::column(column),
            },
            ExprSpec::Param { param } => Expression::parameter(&self.parameter(*param)?),
            ExprSpec::Op { op, args } => self.operation(op, args)?,
            ExprSpec::Function { function, args } => {
                let kind = FunctionKind::parse(function)
                    .ok_or_else(|| CliError::query_error(format!("Unknown function {}", function)))?;
                let args = args.iter().map(|a| self.expr(a)).collect::<CliResult<Vec<_>>>()?;
                Expression::function(kind, args)
            }
            ExprSpec::Aggregate { aggregate, arg } => {
                let kind = AggregateKind::parse(aggregate)
                    .ok_or_else(|| CliError::query_error(format!("Unknown aggregate {}", aggregate)))?;
                match (kind, arg) {
                    (AggregateKind::Count, None) => Expression::count_all(),
                    (_, Some(arg)) => Expression::aggregate(kind, self.expr(arg)?),
                    (_, None) => return Err(CliError::query_error(format!("{} requires an argument", aggregate))),
                }
            }
            ExprSpec::NextValue { next_value } => {
                let sequence = self
                    .session
                    .database()
                    .find_sequence(next_value)
                    .ok_or_else(|| CliError::query_error(format!("Sequence {} not found", next_value)))?;
                Expression::next_value(&sequence)
            }
        };
        Ok(expr)
    }

    fn operation(&mut self, op: &str, args: &[ExprSpec]) -> CliResult<Expression> {
        let mut args = args.iter().map(|a| self.expr(a)).collect::<CliResult<Vec<_>>>()?;
        let op = op.to_ascii_uppercase();
        if args.len() == 1 {
            let arg = args.remove(0);
            return match op.as_str() {
                "-" | "NEG" => Ok(Expression::negate(arg)),
                "NOT" => Ok(Expression::not(arg)),
                _ => Err(CliError::query_error(format!("{} takes two arguments", op))),
            };
        }
        if args.len() != 2 {
            return Err(CliError::query_error(format!("{} takes one or two arguments", op)));
        }
        let right = args.remove(1);
        let left = args.remove(0);
        let expr = if let Some(arith) = arithmetic(&op) {
            Expression::binary(arith, left, right)
        } else if let Some(cmp) = comparison(&op) {
            Expression::compare(cmp, left, right)
        } else {
            match op.as_str() {
                "AND" => Expression::and(left, right),
                "OR" => Expression::or(left, right),
                _ => return Err(CliError::query_error(format!("Unknown operator {}", op))),
            }
        };
        Ok(expr)
    }
}

fn arithmetic(op: &str) -> Option<OpType> {
    [
        OpType::Concat,
        OpType::Plus,
        OpType::Minus,
        OpType::Multiply,
        OpType::Divide,
        OpType::Modulus,
    ]
    .into_iter()
    .find(|t| t.symbol() == op)
}

fn comparison(op: &str) -> Option<CompareType> {
    if op == "!=" {
        return Some(CompareType::NotEqual);
    }
    [
        CompareType::Equal,
        CompareType::NotEqual,
        CompareType::Bigger,
        CompareType::BiggerEqual,
        CompareType::Smaller,
        CompareType::SmallerEqual,
    ]
    .into_iter()
    .find(|t| t.symbol() == op)
}

fn parse_union_type(keyword: &str) -> CliResult<UnionType> {
    let normalized = keyword.trim().to_ascii_uppercase().replace('_', " ");
    [UnionType::Union, UnionType::UnionAll, UnionType::Except, UnionType::Intersect]
        .into_iter()
        .find(|t| t.keyword() == normalized)
        .ok_or_else(|| CliError::query_error(format!("Unknown union type {}", keyword)))
}

/// Every query in the tree sees every parameter, so each level's cache
/// keys on the full parameter list
fn register_parameters(query: &mut Query, parameters: &[Arc<Parameter>]) {
    for p in parameters {
        query.add_parameter(Arc::clone(p));
    }
    if let QueryBody::Union(union) = query.body_mut() {
        register_parameters(union.left_mut(), parameters);
        register_parameters(union.right_mut(), parameters);
    }
}

/// Bind execution parameters by position. Parameters without a value
/// are cleared.
pub fn bind_parameters(query: &Query, values: &[serde_json::Value]) -> CliResult<()> {
    for (i, p) in query.parameters().iter().enumerate() {
        match values.get(i) {
            Some(json) => p.set_value(Value::from_json(json)?),
            None => p.clear(),
        }
    }
    Ok(())
}
