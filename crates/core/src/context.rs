//! Environment a query runs in.

use std::path::Path;
use std::rc::Rc;

use crate::activity::ActivityContext;
use crate::store::{OpenMode, ResourcesDb};

/// Who is asking, which activity is current, and where the data lives.
///
/// The database is optional: without it every result set is empty and
/// inactive, which is how an unavailable store degrades.
#[derive(Clone)]
pub struct StatsContext {
    application: String,
    activities: Rc<dyn ActivityContext>,
    database: Option<Rc<ResourcesDb>>,
}

impl StatsContext {
    pub fn new(
        application: impl Into<String>,
        activities: Rc<dyn ActivityContext>,
        database: Option<Rc<ResourcesDb>>,
    ) -> Self {
        Self { application: application.into(), activities, database }
    }

    /// Open the database read-only, degrading to no database on failure.
    pub fn open(
        application: impl Into<String>,
        activities: Rc<dyn ActivityContext>,
        path: &Path,
    ) -> Self {
        let database = match ResourcesDb::instance(path, OpenMode::ReadOnly) {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!("Resources database {} unavailable: {}", path.display(), e);
                None
            }
        };
        Self::new(application, activities, database)
    }

    /// Identity used for the `:current` agent.
    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn current_activity(&self) -> Option<String> {
        self.activities.current_activity()
    }

    pub fn database(&self) -> Option<&ResourcesDb> {
        self.database.as_deref()
    }

    pub fn database_handle(&self) -> Option<Rc<ResourcesDb>> {
        self.database.clone()
    }
}

impl std::fmt::Debug for StatsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsContext")
            .field("application", &self.application)
            .field("current_activity", &self.current_activity())
            .field("database", &self.database)
            .finish()
    }
}
