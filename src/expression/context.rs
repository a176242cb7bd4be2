//! Evaluation context: the session plus the current row of every table filter

use crate::engine::Session;
use crate::value::Row;

#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    session: &'a Session,
    rows: &'a [&'a Row],
}

impl<'a> EvalContext<'a> {
    /// `rows[slot]` is the current row of the filter at `slot`
    pub fn new(session: &'a Session, rows: &'a [&'a Row]) -> Self {
        Self { session, rows }
    }

    /// Context without rows, for LIMIT / OFFSET / SAMPLE_SIZE
    pub fn constant(session: &'a Session) -> Self {
        Self { session, rows: &[] }
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    pub fn row(&self, slot: usize) -> Option<&'a Row> {
        self.rows.get(slot).copied()
    }
}
