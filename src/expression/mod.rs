//! Expression trees
//!
//! The closed set of expressions a query can hold: constants, column
//! references, aliases, parameters, arithmetic, comparisons, boolean
//! connectives, scalar functions, aggregates and sequence values.
//!
//! Every expression offers:
//! - a canonical SQL rendering (`sql`), used for ORDER BY text matching
//! - constant folding (`constant_value`)
//! - row evaluation (`evaluate`)
//! - the determinism / independence / freshness traversal (`is_everything`)
//! - column binding against table filters (`map_columns`)

mod aggregate;
mod column;
mod condition;
mod context;
mod function;
mod operation;
mod parameter;
mod visitor;

use std::sync::Arc;

use crate::engine::{ColumnResolver, Database, Sequence};
use crate::query::{QueryError, QueryResult};
use crate::value::Value;

pub use aggregate::{AggregateData, AggregateKind};
pub use column::{ColumnBinding, ExpressionColumn};
pub use condition::{AndOr, CompareType};
pub use context::EvalContext;
pub use function::FunctionKind;
pub use operation::OpType;
pub use parameter::Parameter;
pub use visitor::{ExpressionVisitor, VisitorCriterion};

pub(crate) use column::quote_identifier;

#[derive(Debug, Clone)]
pub enum Expression {
    Value(Value),
    Column(ExpressionColumn),
    Alias {
        expr: Box<Expression>,
        alias: String,
    },
    Parameter(Arc<Parameter>),
    Operation {
        op: OpType,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Negate(Box<Expression>),
    Comparison {
        kind: CompareType,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    AndOr {
        kind: AndOr,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
    Function {
        kind: FunctionKind,
        args: Vec<Expression>,
    },
    /// `arg` is `None` for COUNT(*)
    Aggregate {
        kind: AggregateKind,
        arg: Option<Box<Expression>>,
        data: AggregateData,
    },
    SequenceValue(Arc<Sequence>),
}

impl Expression {
    // ==================
    // Construction
    // ==================

    pub fn value(v: impl Into<Value>) -> Self {
        Expression::Value(v.into())
    }

    pub fn null() -> Self {
        Expression::Value(Value::Null)
    }

    pub fn column(name: &str) -> Self {
        Expression::Column(ExpressionColumn::new(None, name))
    }

    pub fn qualified_column(table_alias: &str, name: &str) -> Self {
        Expression::Column(ExpressionColumn::new(Some(table_alias), name))
    }

    pub fn aliased(expr: Expression, alias: &str) -> Self {
        Expression::Alias {
            expr: Box::new(expr),
            alias: alias.to_string(),
        }
    }

    pub fn parameter(parameter: &Arc<Parameter>) -> Self {
        Expression::Parameter(Arc::clone(parameter))
    }

    pub fn binary(op: OpType, left: Expression, right: Expression) -> Self {
        Expression::Operation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn negate(expr: Expression) -> Self {
        Expression::Negate(Box::new(expr))
    }

    pub fn compare(kind: CompareType, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::AndOr {
            kind: AndOr::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::AndOr {
            kind: AndOr::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(expr: Expression) -> Self {
        Expression::Not(Box::new(expr))
    }

    pub fn function(kind: FunctionKind, args: Vec<Expression>) -> Self {
        Expression::Function { kind, args }
    }

    pub fn aggregate(kind: AggregateKind, arg: Expression) -> Self {
        Expression::Aggregate {
            kind,
            arg: Some(Box::new(arg)),
            data: AggregateData::default(),
        }
    }

    pub fn count_all() -> Self {
        Expression::Aggregate {
            kind: AggregateKind::CountAll,
            arg: None,
            data: AggregateData::default(),
        }
    }

    pub fn next_value(sequence: &Arc<Sequence>) -> Self {
        Expression::SequenceValue(Arc::clone(sequence))
    }

    // ==================
    // Inspection
    // ==================

    /// Canonical SQL text
    pub fn sql(&self) -> String {
        match self {
            Expression::Value(v) => v.sql(),
            Expression::Column(c) => c.sql(),
            Expression::Alias { expr, alias } => format!("{} AS {}", expr.sql(), quote_identifier(alias)),
            Expression::Parameter(p) => p.sql(),
            Expression::Operation { op, left, right } => {
                format!("({} {} {})", left.sql(), op.symbol(), right.sql())
            }
            Expression::Negate(e) => format!("(-{})", e.sql()),
            Expression::Comparison { kind, left, right } => {
                format!("({} {} {})", left.sql(), kind.symbol(), right.sql())
            }
            Expression::AndOr { kind, left, right } => {
                format!("({} {} {})", left.sql(), kind.keyword(), right.sql())
            }
            Expression::Not(e) => format!("(NOT {})", e.sql()),
            Expression::Function { kind, args } => {
                let args: Vec<String> = args.iter().map(Expression::sql).collect();
                format!("{}({})", kind.name(), args.join(", "))
            }
            Expression::Aggregate { kind, arg, .. } => match arg {
                Some(arg) => format!("{}({})", kind.name(), arg.sql()),
                None => format!("{}(*)", kind.name()),
            },
            Expression::SequenceValue(seq) => format!("(NEXT VALUE FOR {})", quote_identifier(seq.name())),
        }
    }

    /// Output column name: the alias, the column name, or the SQL text
    pub fn alias(&self) -> String {
        match self {
            Expression::Alias { alias, .. } => alias.clone(),
            Expression::Column(c) => c.column_name().to_string(),
            other => other.sql(),
        }
    }

    /// The expression under an alias, or the expression itself
    pub fn non_alias_expression(&self) -> &Expression {
        match self {
            Expression::Alias { expr, .. } => expr,
            other => other,
        }
    }

    pub fn into_non_alias_expression(self) -> Expression {
        match self {
            Expression::Alias { expr, .. } => *expr,
            other => other,
        }
    }

    pub fn as_column(&self) -> Option<&ExpressionColumn> {
        match self {
            Expression::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, Expression::Alias { .. })
    }

    fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Value(_)
            | Expression::Column(_)
            | Expression::Parameter(_)
            | Expression::SequenceValue(_) => Vec::new(),
            Expression::Alias { expr, .. } | Expression::Negate(expr) | Expression::Not(expr) => vec![expr.as_ref()],
            Expression::Operation { left, right, .. }
            | Expression::Comparison { left, right, .. }
            | Expression::AndOr { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expression::Function { args, .. } => args.iter().collect(),
            Expression::Aggregate { arg, .. } => arg.iter().map(|a| a.as_ref()).collect(),
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Expression> {
        match self {
            Expression::Value(_)
            | Expression::Column(_)
            | Expression::Parameter(_)
            | Expression::SequenceValue(_) => Vec::new(),
            Expression::Alias { expr, .. } | Expression::Negate(expr) | Expression::Not(expr) => vec![expr.as_mut()],
            Expression::Operation { left, right, .. }
            | Expression::Comparison { left, right, .. }
            | Expression::AndOr { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            Expression::Function { args, .. } => args.iter_mut().collect(),
            Expression::Aggregate { arg, .. } => arg.iter_mut().map(|a| a.as_mut()).collect(),
        }
    }

    // ==================
    // Evaluation
    // ==================

    /// Fold to a constant without a row context.
    ///
    /// An unbound parameter folds to NULL.
    pub fn constant_value(&self) -> QueryResult<Value> {
        match self {
            Expression::Value(v) => Ok(v.clone()),
            Expression::Parameter(p) => Ok(p.param_value()),
            Expression::Alias { expr, .. } => expr.constant_value(),
            Expression::Negate(e) => operation::negate(e.constant_value()?),
            Expression::Operation { op, left, right } => {
                operation::apply(*op, left.constant_value()?, right.constant_value()?)
            }
            other => Err(QueryError::InvalidValue(format!("{} is not a constant", other.sql()))),
        }
    }

    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> QueryResult<Value> {
        match self {
            Expression::Value(v) => Ok(v.clone()),
            Expression::Column(c) => c.evaluate(ctx),
            Expression::Alias { expr, .. } => expr.evaluate(ctx),
            Expression::Parameter(p) => p.value(),
            Expression::Operation { op, left, right } => {
                operation::apply(*op, left.evaluate(ctx)?, right.evaluate(ctx)?)
            }
            Expression::Negate(e) => operation::negate(e.evaluate(ctx)?),
            Expression::Comparison { kind, left, right } => {
                Ok(condition::compare(*kind, &left.evaluate(ctx)?, &right.evaluate(ctx)?))
            }
            Expression::AndOr { kind, left, right } => {
                let l = left.evaluate(ctx)?.to_bool()?;
                let short_circuit = match kind {
                    AndOr::And => l == Some(false),
                    AndOr::Or => l == Some(true),
                };
                let truth = if short_circuit {
                    l
                } else {
                    condition::combine(*kind, l, right.evaluate(ctx)?.to_bool()?)
                };
                Ok(truth.map_or(Value::Null, Value::Boolean))
            }
            Expression::Not(e) => Ok(e.evaluate(ctx)?.to_bool()?.map_or(Value::Null, |b| Value::Boolean(!b))),
            Expression::Function { kind, args } => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(ctx))
                    .collect::<QueryResult<Vec<_>>>()?;
                function::call(*kind, ctx.session().user(), values)
            }
            Expression::Aggregate { kind, data, .. } => Ok(data.result(*kind)),
            Expression::SequenceValue(seq) => Ok(Value::Long(seq.next_value())),
        }
    }

    /// Whether the evaluated value is SQL TRUE
    pub fn is_true(&self, ctx: &EvalContext<'_>) -> QueryResult<bool> {
        Ok(self.evaluate(ctx)?.to_bool()? == Some(true))
    }

    // ==================
    // Analysis
    // ==================

    pub fn is_everything(&self, visitor: &mut ExpressionVisitor) -> bool {
        let criterion = visitor.criterion();
        let own = match self {
            Expression::Column(c) => match criterion {
                VisitorCriterion::Independent => c.binding().map_or(true, |b| b.level == 0),
                _ => true,
            },
            Expression::Function { kind, .. } => match criterion {
                VisitorCriterion::Deterministic => kind.is_deterministic(),
                VisitorCriterion::Independent => kind.is_independent(),
                VisitorCriterion::MaxModificationId => true,
            },
            Expression::SequenceValue(seq) => match criterion {
                VisitorCriterion::MaxModificationId => {
                    visitor.add_data_modification_id(seq.modification_id());
                    true
                }
                _ => false,
            },
            _ => true,
        };
        own && self.children().into_iter().all(|child| child.is_everything(visitor))
    }

    pub fn contains_aggregate(&self) -> bool {
        matches!(self, Expression::Aggregate { .. })
            || self.children().into_iter().any(Expression::contains_aggregate)
    }

    /// SQL of the first column reference that is still unbound
    pub fn first_unresolved_column(&self) -> Option<String> {
        match self {
            Expression::Column(c) if !c.is_resolved() => Some(c.sql()),
            other => other
                .children()
                .into_iter()
                .find_map(Expression::first_unresolved_column),
        }
    }

    // ==================
    // Mutation
    // ==================

    pub fn map_columns(&mut self, resolver: &dyn ColumnResolver, level: usize, db: &Database) -> QueryResult<()> {
        if let Expression::Column(c) = self {
            return c.map_columns(resolver, level, db);
        }
        for child in self.children_mut() {
            child.map_columns(resolver, level, db)?;
        }
        Ok(())
    }

    pub fn set_evaluatable(&mut self, resolver_id: u64, evaluatable: bool) {
        if let Expression::Column(c) = self {
            c.set_evaluatable(resolver_id, evaluatable);
            return;
        }
        for child in self.children_mut() {
            child.set_evaluatable(resolver_id, evaluatable);
        }
    }

    /// Feed the current row into every aggregate of this tree
    pub fn update_aggregate(&mut self, ctx: &EvalContext<'_>) -> QueryResult<()> {
        if let Expression::Aggregate { kind, arg, data } = self {
            let input = match arg {
                Some(arg) => Some(arg.evaluate(ctx)?),
                None => None,
            };
            return data.add(*kind, input);
        }
        for child in self.children_mut() {
            child.update_aggregate(ctx)?;
        }
        Ok(())
    }

    pub fn reset_aggregates(&mut self) {
        if let Expression::Aggregate { data, .. } = self {
            data.reset();
            return;
        }
        for child in self.children_mut() {
            child.reset_aggregates();
        }
    }
}
