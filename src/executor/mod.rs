//! Result containers and row ordering
//!
//! # Contents
//!
//! - `LocalResult`: materialized rows with an independent cursor
//! - `ResultTarget`: streaming sink used instead of a materialized result
//! - `SortOrder`: stable multi-key ordering of result rows
//!
//! # Invariants
//!
//! - A shallow copy never shares cursor position or closed state
//! - Sorting is deterministic and stable for ties

mod result;
mod sort_order;
mod target;

pub use result::LocalResult;
pub use sort_order::{NullOrdering, SortOrder, SortType};
pub use target::ResultTarget;
