//! Observability for the query layer
//!
//! - Structured logging (JSON lines)
//! - Atomic counters
//! - Typed events
//!
//! Observability is read-only: nothing logged or counted feeds back into a
//! cache decision.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a typed event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a typed event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::QueryInit);
        log_event_with_fields(Event::ConfigLoaded, &[("tables", "2")]);
    }
}
