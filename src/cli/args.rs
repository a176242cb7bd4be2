//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroquery query --config <path>
//! - aeroquery explain --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeroquery - query result caching and ORDER BY resolution over in-memory tables
#[derive(Parser, Debug)]
#[command(name = "aeroquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute query requests read from stdin, one per line
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,
    },

    /// Describe query requests read from stdin without executing them
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["aeroquery", "query"]);
        match cli.command {
            Command::Query { config } => assert_eq!(config, PathBuf::from("./aeroquery.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_explain_with_config() {
        let cli = Cli::parse_from(["aeroquery", "explain", "--config", "/tmp/x.json"]);
        assert!(matches!(cli.command, Command::Explain { .. }));
    }
}
