//! CLI command implementations
//!
//! Both commands load the config, build the fixture database, then serve
//! one request per stdin line until EOF. A failing request produces an
//! error response; config and I/O failures end the process.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::engine::{Database, DatabaseSettings, Session};
use crate::observability::{log_event_with_fields, Event};
use crate::query::Query;
use crate::value::Value;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response};
use super::request::{bind_parameters, QueryBuilder, QueryRequest};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: DatabaseSettings,

    #[serde(default)]
    pub tables: Vec<TableFixture>,

    #[serde(default)]
    pub sequences: Vec<SequenceFixture>,

    /// User name of the session requests run in
    #[serde(default = "default_user")]
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFixture {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<JsonValue>>,
    /// Rows come from outside; results over it are never reused
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceFixture {
    pub name: String,
    #[serde(default = "default_sequence_start")]
    pub start: i64,
    #[serde(default = "default_sequence_increment")]
    pub increment: i64,
}

fn default_user() -> String {
    "SA".to_string()
}
fn default_sequence_start() -> i64 {
    1
}
fn default_sequence_increment() -> i64 {
    1
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.to_ascii_uppercase()) {
                return Err(CliError::config_error(format!("Duplicate table: '{}'", table.name)));
            }
            if table.columns.is_empty() {
                return Err(CliError::config_error(format!("Table '{}' has no columns", table.name)));
            }
            if let Some(row) = table.rows.iter().find(|r| r.len() != table.columns.len()) {
                return Err(CliError::config_error(format!(
                    "Table '{}' has {} columns, row {} has {}",
                    table.name,
                    table.columns.len(),
                    JsonValue::from(row.clone()),
                    row.len()
                )));
            }
        }

        let mut sequences = HashSet::new();
        for sequence in &self.sequences {
            if !sequences.insert(sequence.name.to_ascii_uppercase()) {
                return Err(CliError::config_error(format!("Duplicate sequence: '{}'", sequence.name)));
            }
            if sequence.increment == 0 {
                return Err(CliError::config_error(format!(
                    "Sequence '{}' increment must not be 0",
                    sequence.name
                )));
            }
        }

        if self.user.trim().is_empty() {
            return Err(CliError::config_error("user must not be empty"));
        }

        Ok(())
    }

    /// Create the database and load every fixture
    pub fn build_database(&self) -> CliResult<Arc<Database>> {
        let db = Database::new("aeroquery", self.settings.clone());
        for fixture in &self.tables {
            let columns: Vec<&str> = fixture.columns.iter().map(String::as_str).collect();
            let table = if fixture.external {
                db.create_external_table(&fixture.name, &columns)
            } else {
                db.create_table(&fixture.name, &columns)
            };
            for row in &fixture.rows {
                let row = row
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| CliError::config_error(format!("Table '{}': {}", fixture.name, e)))?;
                table
                    .insert(row)
                    .map_err(|e| CliError::config_error(format!("Table '{}': {}", fixture.name, e)))?;
            }
        }
        for sequence in &self.sequences {
            db.create_sequence(&sequence.name, sequence.start, sequence.increment);
        }

        let tables = self.tables.len().to_string();
        let sequences = self.sequences.len().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("tables", &tables), ("sequences", &sequences)]);
        Ok(db)
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query { config } => query(&config),
        Command::Explain { config } => explain(&config),
    }
}

/// Execute each request on stdin and print its rows
pub fn query(config_path: &Path) -> CliResult<()> {
    serve(config_path, execute_request)
}

/// Describe each request on stdin without executing it
pub fn explain(config_path: &Path) -> CliResult<()> {
    serve(config_path, explain_request)
}

fn serve<F>(config_path: &Path, handle: F) -> CliResult<()>
where
    F: Fn(&Arc<Session>, JsonValue) -> CliResult<JsonValue>,
{
    let config = Config::load(config_path)?;
    let db = config.build_database()?;
    let session = Session::new(db, config.user.clone());

    for request in read_requests() {
        let outcome = request.and_then(|r| handle(&session, r));
        match outcome {
            Ok(data) => write_response(data)?,
            Err(e) => {
                write_error(e.code_str(), e.message())?;
                if e.is_fatal() {
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}

/// Build the request's query and run every execution in order
pub fn execute_request(session: &Arc<Session>, request: JsonValue) -> CliResult<JsonValue> {
    let request = QueryRequest::from_json(request)?;
    let mut query = QueryBuilder::new(Arc::clone(session)).build(&request)?;
    let columns = column_names(&query);
    let db = session.database();

    let mut executions = Vec::new();
    for execution in request.executions() {
        for insert in &execution.insert {
            let table = db
                .find_table(&insert.table)
                .ok_or_else(|| CliError::query_error(format!("Table {} not found", insert.table)))?;
            for row in &insert.rows {
                table.insert(row.iter().map(Value::from_json).collect::<Result<Vec<_>, _>>()?)?;
            }
        }
        bind_parameters(&query, &execution.params)?;

        let hits_before = query.cache_stats().hits;
        let result = query.execute(execution.max_rows, None)?;
        let rows: Vec<JsonValue> = result
            .map(|r| {
                r.rows()
                    .iter()
                    .map(|row| JsonValue::from(row.iter().map(Value::to_json).collect::<Vec<_>>()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        executions.push(json!({
            "rows": rows,
            "cache_hit": query.cache_stats().hits > hits_before,
        }));
    }

    Ok(json!({
        "columns": columns,
        "executions": executions,
        "cache": query.cache_stats(),
        "metrics": db.metrics().snapshot(),
    }))
}

/// Build and prepare the request's query, then report how it would run
pub fn explain_request(session: &Arc<Session>, request: JsonValue) -> CliResult<JsonValue> {
    let request = QueryRequest::from_json(request)?;
    let mut query = QueryBuilder::new(Arc::clone(session)).build(&request)?;
    query.prepare()?;

    let order_by = query
        .sort()
        .map(|sort| sort.sql(query.expressions(), query.column_count()));
    let tables: Vec<String> = query.tables().iter().map(|t| t.name().to_string()).collect();
    let max_id = query.max_data_modification_id();

    Ok(json!({
        "columns": column_names(&query),
        "expressions": query.expressions().iter().map(|e| e.sql()).collect::<Vec<_>>(),
        "order_by": order_by,
        "tables": tables,
        "deterministic": query.is_deterministic(),
        "independent": query.is_independent(),
        "max_data_modification_id": if max_id == u64::MAX { JsonValue::Null } else { json!(max_id) },
        "cost": query.cost(),
        "cost_as_expression": query.cost_as_expression(),
        "allow_global_conditions": query.allow_global_conditions(),
    }))
}

fn column_names(query: &Query) -> Vec<String> {
    query.expressions()[..query.column_count()]
        .iter()
        .map(|e| e.alias())
        .collect()
}
