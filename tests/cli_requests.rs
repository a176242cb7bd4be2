//! CLI Request Tests
//!
//! End-to-end through the JSON surface: config file, request building,
//! repeated executions and explain output.

use std::fs;
use std::sync::Arc;

use aeroquery::cli::{execute_request, explain_request, CliErrorCode, Config};
use aeroquery::engine::Session;
use serde_json::json;
use tempfile::TempDir;

fn session(config: serde_json::Value) -> Arc<Session> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("aeroquery.json");
    fs::write(&path, config.to_string()).unwrap();
    let config = Config::load(&path).unwrap();
    Session::new(config.build_database().unwrap(), config.user.clone())
}

fn fixture() -> Arc<Session> {
    session(json!({
        "settings": {"optimize_reuse_results": true},
        "tables": [
            {"name": "ORDERS", "columns": ["ID", "AMOUNT"], "rows": [[1, 10], [2, 30], [3, 20]]},
            {"name": "REFUNDS", "columns": ["ID", "AMOUNT"], "rows": [[2, 30]]}
        ],
        "sequences": [{"name": "SEQ"}],
        "user": "alice"
    }))
}

// =============================================================================
// Execute
// =============================================================================

#[test]
fn test_parameters_per_execution() {
    let s = fixture();
    let data = execute_request(
        &s,
        json!({
            "select": [{"expr": {"column": "ID"}}],
            "from": [{"table": "ORDERS"}],
            "where": {"op": ">", "args": [{"column": "AMOUNT"}, {"param": 1}]},
            "order_by": [{"ordinal": 1}],
            "executions": [{"params": [15]}, {"params": [15]}, {"params": [25]}]
        }),
    )
    .unwrap();

    let executions = data["executions"].as_array().unwrap();
    assert_eq!(executions[0]["rows"], json!([[2], [3]]));
    assert_eq!(executions[1]["cache_hit"], true);
    assert_eq!(executions[2]["rows"], json!([[2]]));
    assert_eq!(executions[2]["cache_hit"], false);
    assert_eq!(data["cache"]["hits"], 1);
}

#[test]
fn test_missing_parameter_fails() {
    let s = fixture();
    let err = execute_request(
        &s,
        json!({
            "select": [{"expr": {"param": 1}}],
            "executions": [{"params": []}]
        }),
    )
    .unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::QueryError);
    assert_eq!(err.code_str(), "AERO_PARAMETER_NOT_SET");
}

#[test]
fn test_union_except_request() {
    let s = fixture();
    let data = execute_request(
        &s,
        json!({
            "union": "EXCEPT",
            "left": {"select": [{"expr": {"column": "ID"}}], "from": [{"table": "ORDERS"}]},
            "right": {"select": [{"expr": {"column": "ID"}}], "from": [{"table": "REFUNDS"}]},
            "order_by": [{"ordinal": 1, "desc": true}]
        }),
    )
    .unwrap();
    assert_eq!(data["executions"][0]["rows"], json!([[3], [1]]));
}

#[test]
fn test_aggregate_and_session_user() {
    let s = fixture();
    let data = execute_request(
        &s,
        json!({
            "select": [
                {"expr": {"aggregate": "SUM", "arg": {"column": "AMOUNT"}}, "alias": "TOTAL"},
                {"expr": {"function": "CURRENT_USER"}, "alias": "WHO"}
            ],
            "from": [{"table": "ORDERS"}]
        }),
    )
    .unwrap();
    assert_eq!(data["columns"], json!(["TOTAL", "WHO"]));
    assert_eq!(data["executions"][0]["rows"], json!([[60, "alice"]]));
}

#[test]
fn test_unknown_table() {
    let s = fixture();
    let err = execute_request(
        &s,
        json!({"select": [{"expr": {"column": "ID"}}], "from": [{"table": "NOPE"}]}),
    )
    .unwrap_err();
    assert_eq!(err.code_str(), "AERO_CLI_QUERY_ERROR");
}

// =============================================================================
// Explain
// =============================================================================

#[test]
fn test_explain_sequence_query() {
    let s = fixture();
    let data = explain_request(
        &s,
        json!({"select": [{"expr": {"next_value": "SEQ"}, "alias": "N"}]}),
    )
    .unwrap();
    assert_eq!(data["deterministic"], false);
    assert_eq!(data["expressions"], json!(["(NEXT VALUE FOR SEQ) AS N"]));
}

#[test]
fn test_explain_hidden_order_column() {
    let s = fixture();
    let data = explain_request(
        &s,
        json!({
            "select": [{"expr": {"column": "ID"}}],
            "from": [{"table": "ORDERS"}],
            "order_by": [{"expr": {"column": "AMOUNT"}, "desc": true, "nulls_last": true}],
            "limit": 2
        }),
    )
    .unwrap();
    assert_eq!(data["columns"], json!(["ID"]));
    assert_eq!(data["order_by"], json!("AMOUNT DESC NULLS LAST"));
    assert_eq!(data["allow_global_conditions"], false);
    assert_eq!(data["cost"], json!(3.0));
    assert_eq!(data["cost_as_expression"], 40);
}
