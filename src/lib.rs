//! aeroquery - result caching and ORDER BY resolution for SQL queries
//!
//! A query is compiled once and executed many times. Between executions it
//! keeps its last result and hands it back when nothing it depends on has
//! changed: same parameters, same limit, no data modified, and no
//! non-deterministic expression involved.

pub mod cli;
pub mod engine;
pub mod executor;
pub mod expression;
pub mod observability;
pub mod query;
pub mod value;
