//! CLI module for aeroquery
//!
//! Provides command-line interface for:
//! - query: Execute JSON query requests against a fixture database
//! - explain: Describe JSON query requests without executing them

mod args;
mod commands;
mod errors;
mod io;
mod request;

pub use args::{Cli, Command};
pub use commands::{execute_request, explain, explain_request, query, run, run_command, Config, SequenceFixture, TableFixture};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_response};
pub use request::{bind_parameters, ExecutionSpec, ExprSpec, QueryBuilder, QueryRequest};
