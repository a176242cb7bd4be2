//! Union Query Tests
//!
//! UNION / UNION ALL / EXCEPT / INTERSECT bodies:
//! - Column count agreement
//! - Set semantics per union type
//! - ORDER BY restricted to the result list
//! - Global condition pushdown

use std::sync::Arc;

use aeroquery::engine::{Database, DatabaseSettings, Session, Table, TableFilter};
use aeroquery::expression::{CompareType, Expression, Parameter};
use aeroquery::query::{Query, QueryBody, QueryError, Select, SelectOrderBy, UnionType};
use aeroquery::value::Value;

fn setup() -> (Arc<Session>, Arc<Table>, Arc<Table>) {
    let db = Database::new("union", DatabaseSettings::default());
    let a = db.create_table("A", &["X"]);
    let b = db.create_table("B", &["X"]);
    for v in [1, 2, 2, 3] {
        a.insert(vec![Value::Int(v)]).unwrap();
    }
    for v in [3, 4] {
        b.insert(vec![Value::Int(v)]).unwrap();
    }
    (Session::new(db, "SA"), a, b)
}

fn scan(session: &Arc<Session>, table: &Arc<Table>, columns: &[&str]) -> Query {
    let mut select = Select::new();
    select.add_table_filter(TableFilter::new(Arc::clone(table), None));
    for c in columns {
        select.add_expression(Expression::column(c));
    }
    Query::select(Arc::clone(session), select)
}

fn union(union_type: UnionType) -> (Arc<Session>, Query) {
    let (session, a, b) = setup();
    let mut q = Query::union(
        Arc::clone(&session),
        union_type,
        scan(&session, &a, &["X"]),
        scan(&session, &b, &["X"]),
    );
    q.set_order(vec![SelectOrderBy::ordinal(1)]);
    (session, q)
}

fn values(q: &mut Query) -> Vec<i32> {
    q.execute(0, None)
        .unwrap()
        .unwrap()
        .rows()
        .iter()
        .map(|r| r[0].to_int().unwrap())
        .collect()
}

// =============================================================================
// Set semantics
// =============================================================================

#[test]
fn test_union_all_keeps_duplicates() {
    let (_, mut q) = union(UnionType::UnionAll);
    q.init().unwrap();
    assert_eq!(values(&mut q), vec![1, 2, 2, 3, 3, 4]);
}

#[test]
fn test_union_removes_duplicates() {
    let (_, mut q) = union(UnionType::Union);
    q.init().unwrap();
    assert_eq!(values(&mut q), vec![1, 2, 3, 4]);
}

#[test]
fn test_except() {
    let (_, mut q) = union(UnionType::Except);
    q.init().unwrap();
    assert_eq!(values(&mut q), vec![1, 2]);
}

#[test]
fn test_intersect() {
    let (_, mut q) = union(UnionType::Intersect);
    q.init().unwrap();
    assert_eq!(values(&mut q), vec![3]);
}

#[test]
fn test_union_limit_and_offset() {
    let (_, mut q) = union(UnionType::UnionAll);
    q.set_limit(Some(Expression::value(2)));
    q.set_offset(Some(Expression::value(1)));
    q.init().unwrap();
    assert_eq!(values(&mut q), vec![2, 2]);
}

// =============================================================================
// Shape checks
// =============================================================================

#[test]
fn test_column_count_mismatch() {
    let db = Database::new("mismatch", DatabaseSettings::default());
    let wide = db.create_table("W", &["P", "Q"]);
    let narrow = db.create_table("N", &["P"]);
    let session = Session::new(db, "SA");
    let mut q = Query::union(
        Arc::clone(&session),
        UnionType::Union,
        scan(&session, &wide, &["P", "Q"]),
        scan(&session, &narrow, &["P"]),
    );
    assert_eq!(q.init().unwrap_err(), QueryError::ColumnCountMismatch(2, 1));
}

/// ORDER BY on a union must name a result column.
#[test]
fn test_order_must_be_in_result() {
    let (session, a, b) = setup();
    let mut q = Query::union(
        Arc::clone(&session),
        UnionType::Union,
        scan(&session, &a, &["X"]),
        scan(&session, &b, &["X"]),
    );
    q.set_order(vec![SelectOrderBy::expression(Expression::column("Y"))]);
    assert_eq!(q.init().unwrap_err(), QueryError::OrderByNotInResult("Y".to_string()));
}

#[test]
fn test_order_by_result_column_name() {
    let (session, a, b) = setup();
    let mut q = Query::union(
        Arc::clone(&session),
        UnionType::Union,
        scan(&session, &a, &["X"]),
        scan(&session, &b, &["X"]),
    );
    q.set_order(vec![SelectOrderBy::expression(Expression::column("X")).descending()]);
    q.init().unwrap();
    assert_eq!(values(&mut q), vec![4, 3, 2, 1]);
}

// =============================================================================
// Caching and analysis
// =============================================================================

#[test]
fn test_union_result_is_cached() {
    let (_, mut q) = union(UnionType::Union);
    q.init().unwrap();
    values(&mut q);
    values(&mut q);
    assert_eq!(q.cache_stats().hits, 1);
}

#[test]
fn test_modifying_either_side_invalidates() {
    let (session, mut q) = union(UnionType::UnionAll);
    q.init().unwrap();
    values(&mut q);
    let b = session.database().find_table("B").unwrap();
    b.insert(vec![Value::Int(0)]).unwrap();
    assert_eq!(values(&mut q), vec![0, 1, 2, 2, 3, 3, 4]);
    assert_eq!(q.cache_stats().hits, 0);
}

#[test]
fn test_tables_and_cost() {
    let (_, q) = union(UnionType::Union);
    let names: Vec<String> = q.tables().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(q.cost(), 6.0);
}

// =============================================================================
// Global conditions
// =============================================================================

#[test]
fn test_global_condition_pushed_into_both_sides() {
    let (_, mut q) = union(UnionType::UnionAll);
    let param = Parameter::new(0);
    q.add_global_condition(&param, 0, CompareType::BiggerEqual).unwrap();
    q.init().unwrap();
    param.set_value(3);
    assert_eq!(values(&mut q), vec![3, 3, 4]);
}

/// EXCEPT filters only its left side.
#[test]
fn test_global_condition_except_left_only() {
    let (_, mut q) = union(UnionType::Except);
    let param = Parameter::new(0);
    q.add_global_condition(&param, 0, CompareType::Bigger).unwrap();
    q.init().unwrap();
    param.set_value(1);
    assert_eq!(values(&mut q), vec![2]);
}

/// LIMIT with ORDER BY or OFFSET pins which rows are selected.
#[test]
fn test_global_condition_not_allowed_with_offset() {
    let (_, mut q) = union(UnionType::Union);
    q.set_offset(Some(Expression::value(1)));
    assert!(!q.allow_global_conditions());
    let param = Parameter::new(0);
    assert_eq!(
        q.add_global_condition(&param, 0, CompareType::Equal).unwrap_err(),
        QueryError::GlobalConditionNotAllowed
    );

    let (_, mut q) = union(UnionType::Union);
    q.set_limit(Some(Expression::value(1)));
    assert!(!q.allow_global_conditions());
}

/// A parameter declared on one side is part of the union's cache key.
#[test]
fn test_child_parameter_rebind_recomputes() {
    let (session, a, _) = setup();
    let param = Parameter::new(0);
    let mut left = scan(&session, &a, &["X"]);
    if let QueryBody::Select(select) = left.body_mut() {
        select.add_condition(Expression::compare(
            CompareType::Equal,
            Expression::column("X"),
            Expression::parameter(&param),
        ));
    }
    left.add_parameter(Arc::clone(&param));
    let mut constant = Select::new();
    constant.add_expression(Expression::value(9));
    let right = Query::select(Arc::clone(&session), constant);

    let mut q = Query::union(Arc::clone(&session), UnionType::UnionAll, left, right);
    q.init().unwrap();

    param.set_value(1);
    assert_eq!(values(&mut q), vec![1, 9]);
    param.set_value(3);
    assert_eq!(values(&mut q), vec![3, 9]);
    assert_eq!(q.cache_stats().hits, 0);

    param.clear();
    assert_eq!(q.execute(0, None).unwrap_err(), QueryError::ParameterNotSet(1));
}
