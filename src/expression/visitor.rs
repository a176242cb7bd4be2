//! Expression tree analysis
//!
//! One traversal, three criteria:
//!
//! - `Deterministic`: the tree yields the same value for the same inputs
//! - `Independent`: the value does not depend on session state or on an
//!   outer query's current row
//! - `MaxModificationId`: collect the highest modification id of every
//!   referenced table and sequence; `u64::MAX` means "not trackable"
//!
//! The first two answer yes/no. The last always answers yes and leaves its
//! result in the visitor.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorCriterion {
    Deterministic,
    Independent,
    MaxModificationId,
}

#[derive(Debug, Clone)]
pub struct ExpressionVisitor {
    criterion: VisitorCriterion,
    max_data_modification_id: u64,
}

impl ExpressionVisitor {
    pub fn new(criterion: VisitorCriterion) -> Self {
        Self {
            criterion,
            max_data_modification_id: 0,
        }
    }

    pub fn deterministic() -> Self {
        Self::new(VisitorCriterion::Deterministic)
    }

    pub fn independent() -> Self {
        Self::new(VisitorCriterion::Independent)
    }

    pub fn max_modification_id() -> Self {
        Self::new(VisitorCriterion::MaxModificationId)
    }

    pub fn criterion(&self) -> VisitorCriterion {
        self.criterion
    }

    /// Record a referenced object's modification id
    pub fn add_data_modification_id(&mut self, id: u64) {
        if id > self.max_data_modification_id {
            self.max_data_modification_id = id;
        }
    }

    pub fn max_data_modification_id(&self) -> u64 {
        self.max_data_modification_id
    }
}
