//! Sessions

use std::sync::Arc;

use uuid::Uuid;

use super::database::Database;

/// Execution context of a query: who runs it, against which database
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    user: String,
    database: Arc<Database>,
}

impl Session {
    pub fn new(database: Arc<Database>, user: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            user: user.into(),
            database,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }
}
