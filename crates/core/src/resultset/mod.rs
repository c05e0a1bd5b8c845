//! One-shot execution of queries.
//!
//! A [`ResultSet`] runs the compiled query once and hands out
//! [`ResultRecord`]s by index. The linked-activities lookup for a record is
//! only done when that record is requested. Result sets are meant to be
//! consumed right away; long-lived views go through
//! [`ResultModel`](crate::model::ResultModel).
//!
//! # Example
//!
//! ```no_run
//! use actstats_core::activity::SharedActivity;
//! use actstats_core::context::StatsContext;
//! use actstats_core::query::terms::{Agent, Limit, Order, Select};
//! use actstats_core::resultset::ResultSet;
//! use std::path::Path;
//! use std::rc::Rc;
//!
//! let ctx = StatsContext::open(
//!     "org.example.app",
//!     Rc::new(SharedActivity::with_current("activity1")),
//!     Path::new("resources/database"),
//! );
//! let query = Select::UsedResources | Order::HighScoredFirst | Agent::from("gvim") | Limit(2);
//! for result in ResultSet::open(&query, &ctx).unwrap().iter() {
//!     println!("{} {}", result.resource, result.score);
//! }
//! ```

pub mod compiler;
pub mod types;

use std::rc::Rc;

use thiserror::Error;

use crate::context::StatsContext;
use crate::query::Query;
use crate::store::{ResourcesDb, StoreError};

pub use compiler::{Combinator, CompiledQuery, OrderingSpec, compile};
pub use types::{LinkStatus, ResultRecord};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Current activity is not known yet")]
    ActivityNotReady,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
struct RawRow {
    resource: String,
    title: String,
    mimetype: Option<String>,
    score: f64,
    first_update: i64,
    last_update: i64,
    link_status: i64,
    agent: Option<String>,
}

/// Rows of an executed query.
#[derive(Debug)]
pub struct ResultSet {
    database: Option<Rc<ResourcesDb>>,
    rows: Vec<RawRow>,
    active: bool,
}

impl ResultSet {
    /// Run `query`, degrading to an empty, inactive set when the store is
    /// missing or fails.
    ///
    /// Only an unknown current activity is reported as an error.
    pub fn open(query: &Query, ctx: &StatsContext) -> Result<Self, QueryError> {
        match Self::try_open(query, ctx) {
            Err(QueryError::Store(e)) => {
                tracing::warn!("Query failed, returning no results: {}", e);
                Ok(Self::empty())
            }
            other => other,
        }
    }

    /// Run `query`, reporting store failures.
    pub fn try_open(query: &Query, ctx: &StatsContext) -> Result<Self, QueryError> {
        let current = ctx.current_activity();
        let compiled = compile(query, ctx.application(), current.as_deref())?;

        let Some(database) = ctx.database_handle() else {
            tracing::debug!("No resources database, empty result set");
            return Ok(Self::empty());
        };

        tracing::trace!("Executing query: {}", compiled.sql);
        let rows = Self::execute(&database, &compiled.sql)?;
        Ok(Self { database: Some(database), rows, active: true })
    }

    fn empty() -> Self {
        Self { database: None, rows: Vec::new(), active: false }
    }

    fn execute(db: &ResourcesDb, sql: &str) -> Result<Vec<RawRow>, StoreError> {
        let mut stmt = db.connection().prepare(sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawRow {
                    resource: row.get("resource")?,
                    title: row.get("title")?,
                    mimetype: row.get("mimetype")?,
                    score: row.get::<_, Option<f64>>("score")?.unwrap_or_default(),
                    first_update: row.get::<_, Option<i64>>("firstUpdate")?.unwrap_or_default(),
                    last_update: row.get::<_, Option<i64>>("lastUpdate")?.unwrap_or_default(),
                    link_status: row.get("linkStatus")?,
                    agent: row.get("agent")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// False when the query could not run against a store.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The record at `index`, or `None` past either end.
    pub fn at(&self, index: usize) -> Option<ResultRecord> {
        let row = self.rows.get(index)?;

        let linked_activities = match &self.database {
            Some(db) => db.linked_activities(&row.resource).unwrap_or_else(|e| {
                tracing::warn!("Cannot read links of {}: {}", row.resource, e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        Some(ResultRecord {
            resource: row.resource.clone(),
            title: row.title.clone(),
            mimetype: row.mimetype.clone().unwrap_or_default(),
            score: row.score,
            last_update: types::to_timestamp(row.last_update),
            first_update: types::to_timestamp(row.first_update),
            link_status: LinkStatus::from_i64(row.link_status),
            linked_activities,
            agent: row.agent.clone().unwrap_or_default(),
        })
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter { set: self, front: 0, back: self.rows.len() }
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = ResultRecord;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Double-ended iterator over a [`ResultSet`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    set: &'a ResultSet,
    front: usize,
    back: usize,
}

impl Iterator for Iter<'_> {
    type Item = ResultRecord;

    fn next(&mut self) -> Option<ResultRecord> {
        if self.front >= self.back {
            return None;
        }
        let item = self.set.at(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }

    fn nth(&mut self, n: usize) -> Option<ResultRecord> {
        self.front = self.front.saturating_add(n).min(self.back);
        self.next()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<ResultRecord> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.set.at(self.back)
    }
}

impl ExactSizeIterator for Iter<'_> {}
