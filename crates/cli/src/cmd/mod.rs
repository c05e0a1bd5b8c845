pub mod forget;
pub mod info;
pub mod init;
pub mod link;
pub mod output;
pub mod query;
pub mod record;
pub mod watch;

use std::fs;
use std::rc::Rc;
use std::str::FromStr;

use actstats_core::activity::SharedActivity;
use actstats_core::config::ResolvedConfig;
use actstats_core::context::StatsContext;
use actstats_core::query::terms::{Activity, Agent, Date, Limit, Offset, Title, Type, Url};
use actstats_core::query::Query;
use actstats_core::service::LocalStatsService;
use actstats_core::store::{OpenMode, ResourcesDb, StoreError};
use color_eyre::eyre::{eyre, Result};

use crate::TermArgs;

/// What every command runs against.
pub struct Env {
    pub config: ResolvedConfig,
    pub activity: Rc<SharedActivity>,
}

impl Env {
    pub fn new(config: ResolvedConfig, activity: Option<String>) -> Self {
        let activity = match activity {
            Some(id) => SharedActivity::with_current(id),
            None => SharedActivity::new(),
        };
        Self { config, activity: Rc::new(activity) }
    }

    /// Read-only context; a missing database gives empty results.
    pub fn context(&self) -> StatsContext {
        StatsContext::open(
            self.config.application.clone(),
            self.activity.clone(),
            &self.config.database_path,
        )
    }

    /// Read-write connection. Failing to get one ends the process.
    pub fn open_writable(&self) -> Result<Rc<ResourcesDb>> {
        let path = &self.config.database_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match ResourcesDb::instance(path, OpenMode::ReadWrite) {
            Ok(db) => Ok(db),
            Err(e @ StoreError::WriteModeUnavailable { .. }) => {
                eprintln!("FAIL {e}");
                std::process::exit(1);
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn service(&self) -> Result<LocalStatsService> {
        Ok(LocalStatsService::new(
            self.open_writable()?,
            self.activity.clone(),
            self.config.application.clone(),
        ))
    }
}

impl TermArgs {
    pub fn to_query(&self) -> Result<Query> {
        let mut query = Query::new(self.select) | self.order;

        if !self.agents.is_empty() {
            query = query | Agent::new(&self.agents);
        }
        if !self.activities.is_empty() {
            query = query | Activity::new(&self.activities);
        }
        if !self.types.is_empty() {
            query = query | Type::new(&self.types);
        }
        if !self.urls.is_empty() {
            query = query | Url::new(&self.urls);
        }
        if !self.titles.is_empty() {
            query = query | Title::new(&self.titles);
        }
        if let Some(date) = &self.date {
            let date = Date::from_str(date).map_err(|e| eyre!("Invalid date '{date}': {e}"))?;
            query = query | date;
        }
        if self.limit > 0 {
            query = query | Limit(self.limit) | Offset(self.offset);
        }

        Ok(query)
    }
}
