//! CLI-specific error types
//!
//! Config and I/O errors end the process. Query errors are reported per
//! request and the loop continues.

use std::fmt;
use std::io;

use crate::query::QueryError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Request could not be built or executed
    QueryError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AERO_CLI_CONFIG_ERROR",
            Self::IoError => "AERO_CLI_IO_ERROR",
            Self::QueryError => "AERO_CLI_QUERY_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    /// Code of the underlying query error, if any
    query_code: Option<&'static str>,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            query_code: None,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Malformed request
    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::QueryError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// The query error code when there is one, else the CLI code
    pub fn code_str(&self) -> &'static str {
        self.query_code.unwrap_or_else(|| self.code.code())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the request loop can go on after this error
    pub fn is_fatal(&self) -> bool {
        self.code != CliErrorCode::QueryError
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        Self {
            code: CliErrorCode::QueryError,
            message: e.to_string(),
            query_code: Some(e.code()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
