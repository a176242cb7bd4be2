//! Observable query events
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration loaded (CLI)
    ConfigLoaded,
    /// Query initialized: order resolved, columns mapped
    QueryInit,
    /// Cached result reused
    QueryCacheHit,
    /// Result recomputed and stored
    QueryCacheMiss,
    /// Result computed without consulting the cache
    QueryCacheBypass,
    /// Query references an object without tracked modifications
    QueryNeverCacheable,
    /// ORDER BY entry rejected
    OrderByRejected,
    /// Before-select trigger fired
    TriggerFired,
    /// Execute failed
    QueryFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::QueryInit => "QUERY_INIT",
            Event::QueryCacheHit => "QUERY_CACHE_HIT",
            Event::QueryCacheMiss => "QUERY_CACHE_MISS",
            Event::QueryCacheBypass => "QUERY_CACHE_BYPASS",
            Event::QueryNeverCacheable => "QUERY_NEVER_CACHEABLE",
            Event::OrderByRejected => "ORDER_BY_REJECTED",
            Event::TriggerFired => "TRIGGER_FIRED",
            Event::QueryFailed => "QUERY_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::ConfigLoaded | Event::QueryNeverCacheable => Severity::Info,
            Event::OrderByRejected => Severity::Warn,
            Event::QueryFailed => Severity::Error,
            Event::QueryInit
            | Event::QueryCacheHit
            | Event::QueryCacheMiss
            | Event::QueryCacheBypass
            | Event::TriggerFired => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::QueryCacheHit.as_str(), "QUERY_CACHE_HIT");
        assert_eq!(Event::OrderByRejected.to_string(), "ORDER_BY_REJECTED");
    }

    #[test]
    fn test_cache_decisions_are_trace() {
        assert_eq!(Event::QueryCacheHit.severity(), Severity::Trace);
        assert_eq!(Event::QueryCacheMiss.severity(), Severity::Trace);
        assert_eq!(Event::QueryFailed.severity(), Severity::Error);
    }
}
