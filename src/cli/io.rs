//! JSON-lines I/O for the CLI
//!
//! - Input: one JSON object per line on stdin
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Parse one request line. Blank lines are `None`.
pub fn parse_request(line: &str) -> CliResult<Option<Value>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Read requests from stdin until EOF, skipping blank lines
pub fn read_requests() -> impl Iterator<Item = CliResult<Value>> {
    let stdin = io::stdin();
    stdin
        .lock()
        .lines()
        .map(|line| parse_request(&line.map_err(CliError::from)?))
        .filter_map(Result::transpose)
}

/// Success envelope
pub fn ok_envelope(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope
pub fn error_envelope(code: &str, message: &str) -> Value {
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&ok_envelope(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&error_envelope(code, message))
}

fn write_line(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(parse_request("   ").unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_io_error() {
        let err = parse_request("{not json").unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_IO_ERROR");
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(ok_envelope(json!(1)), json!({"status": "ok", "data": 1}));
        assert_eq!(error_envelope("X", "m")["status"], "error");
    }
}
