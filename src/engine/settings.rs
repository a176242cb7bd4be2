//! Database settings
//!
//! Loaded from the `settings` object of the CLI config; every field has a
//! default so an empty object is valid.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Reuse the previous result of a query when it is provably unchanged.
    #[serde(default = "default_optimize_reuse_results")]
    pub optimize_reuse_results: bool,

    /// Compare identifiers ignoring ASCII case. When false, identifiers
    /// are assumed to be folded already and must match exactly.
    #[serde(default)]
    pub case_insensitive_identifiers: bool,

    /// Sort NULL above every other value when no NULLS FIRST / LAST is given.
    #[serde(default)]
    pub sort_nulls_high: bool,
}

fn default_optimize_reuse_results() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            optimize_reuse_results: default_optimize_reuse_results(),
            case_insensitive_identifiers: false,
            sort_nulls_high: false,
        }
    }
}

impl DatabaseSettings {
    pub fn with_case_insensitive_identifiers(mut self, value: bool) -> Self {
        self.case_insensitive_identifiers = value;
        self
    }

    pub fn with_optimize_reuse_results(mut self, value: bool) -> Self {
        self.optimize_reuse_results = value;
        self
    }

    pub fn with_sort_nulls_high(mut self, value: bool) -> Self {
        self.sort_nulls_high = value;
        self
    }
}
