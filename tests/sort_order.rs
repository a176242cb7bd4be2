//! Sort Specification Tests
//!
//! - Resolved ORDER BY lists become a `SortOrder`
//! - Sorting is stable and idempotent
//! - Sort type codes round-trip through their integer form

use aeroquery::engine::{Database, DatabaseSettings};
use aeroquery::executor::{NullOrdering, SortOrder, SortType};
use aeroquery::expression::Expression;
use aeroquery::query::{init_order, prepare_order, SelectOrderBy};
use aeroquery::value::{Row, Value};

fn row(a: i32, tag: &str) -> Row {
    vec![Value::Int(a), Value::from(tag)]
}

// =============================================================================
// Sorting
// =============================================================================

/// Rows with equal keys keep their input order.
#[test]
fn test_sort_is_stable() {
    let sort = SortOrder::new(vec![0], vec![SortType::ascending()], false);
    let mut rows = vec![row(2, "a"), row(1, "b"), row(2, "c"), row(1, "d")];
    sort.sort(&mut rows);
    assert_eq!(rows, vec![row(1, "b"), row(1, "d"), row(2, "a"), row(2, "c")]);
}

/// Sorting sorted rows changes nothing.
#[test]
fn test_sort_is_idempotent() {
    let sort = SortOrder::new(
        vec![0, 1],
        vec![SortType::descending(), SortType::ascending()],
        false,
    );
    let mut rows = vec![row(1, "z"), row(3, "y"), row(3, "x"), row(2, "w")];
    sort.sort(&mut rows);
    let once = rows.clone();
    sort.sort(&mut rows);
    assert_eq!(rows, once);
    assert_eq!(once, vec![row(3, "x"), row(3, "y"), row(2, "w"), row(1, "z")]);
}

/// Later keys break ties of earlier ones.
#[test]
fn test_secondary_key() {
    let sort = SortOrder::new(
        vec![1, 0],
        vec![SortType::ascending(), SortType::descending()],
        false,
    );
    let mut rows = vec![row(1, "a"), row(2, "b"), row(3, "a")];
    sort.sort(&mut rows);
    assert_eq!(rows, vec![row(3, "a"), row(1, "a"), row(2, "b")]);
}

// =============================================================================
// Sort type codes
// =============================================================================

#[test]
fn test_sort_type_codes() {
    assert_eq!(SortType::ascending().code(), SortType::ASCENDING);
    assert_eq!(SortType::descending().code(), SortType::DESCENDING);
    let t = SortType::new(true, NullOrdering::Last);
    assert_eq!(t.code(), SortType::DESCENDING | SortType::NULLS_LAST);
    assert_eq!(SortType::from_code(t.code()), t);
    assert_eq!(
        SortType::from_code(SortType::NULLS_FIRST),
        SortType::new(false, NullOrdering::First)
    );
}

// =============================================================================
// From ORDER BY lists
// =============================================================================

/// Resolution followed by preparation yields one key per entry.
#[test]
fn test_prepare_after_init() {
    let db = Database::new("sort", DatabaseSettings::default());
    let mut expressions = vec![
        Expression::aliased(Expression::column("ID"), "K"),
        Expression::column("NAME"),
    ];
    let mut order = vec![
        SelectOrderBy::expression(Expression::column("NAME")).descending(),
        SelectOrderBy::expression(Expression::column("K")).nulls_last(),
        SelectOrderBy::ordinal(-2),
    ];
    init_order(&db, &mut expressions, None, &mut order, 2, false, None).unwrap();
    let sort = prepare_order(&db, &order, expressions.len()).unwrap();

    assert_eq!(sort.indexes(), &[1, 0, 1]);
    assert_eq!(
        sort.sort_types(),
        &[
            SortType::descending(),
            SortType::new(false, NullOrdering::Last),
            SortType::descending(),
        ]
    );
    assert_eq!(sort.sql(&expressions, 2), "2 DESC, 1 NULLS LAST, 2 DESC");
}

/// Hidden columns render as their expression.
#[test]
fn test_sql_for_hidden_column() {
    let db = Database::new("sort", DatabaseSettings::default());
    let mut expressions = vec![Expression::column("NAME")];
    let mut sqls = vec!["NAME".to_string()];
    let mut order = vec![SelectOrderBy::expression(Expression::column("ID"))];
    init_order(&db, &mut expressions, Some(&mut sqls), &mut order, 1, false, None).unwrap();
    let sort = prepare_order(&db, &order, expressions.len()).unwrap();

    assert_eq!(sqls, vec!["NAME".to_string(), "ID".to_string()]);
    assert_eq!(sort.sql(&expressions, 1), "ID");
}
