//! Engine collaborators of the query layer
//!
//! Small in-memory renditions of the database, its tables and sequences,
//! sessions and table filters. The query layer only relies on:
//!
//! - the modification clock and per-object modification ids
//! - identifier and value equality under the database settings
//! - the result reuse switch
//! - before-select triggers

mod database;
mod filter;
mod sequence;
mod session;
mod settings;
mod table;

pub use database::{Database, ModificationClock};
pub use filter::{ColumnResolver, TableFilter};
pub use sequence::Sequence;
pub use session::Session;
pub use settings::DatabaseSettings;
pub use table::{SelectTrigger, Table, TableType};
