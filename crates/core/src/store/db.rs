//! Database connection and operations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use rusqlite::{Connection, DropBehavior, OpenFlags, OptionalExtension, Transaction, params};
use thiserror::Error;

use super::schema::{SchemaError, init_schema};
use super::types::{ResourceInfo, ScoreRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Cannot open resources database {} for writing: {source}", path.display())]
    WriteModeUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database is open read-only")]
    ReadOnly,
}

/// How a connection to the resources database is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// Queries only; the connection refuses every mutation.
    ReadOnly,
    /// Writes inside explicit transactions, WAL journal.
    ReadWrite,
}

thread_local! {
    static INSTANCES: RefCell<HashMap<(PathBuf, OpenMode), Weak<ResourcesDb>>> =
        RefCell::new(HashMap::new());
}

/// Handle to the resources database.
pub struct ResourcesDb {
    conn: Connection,
    mode: OpenMode,
}

impl std::fmt::Debug for ResourcesDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcesDb").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl ResourcesDb {
    /// Open a new connection to the database at `path`.
    ///
    /// Read-write connections create the schema when it is missing. A failure
    /// to open one is reported as [`StoreError::WriteModeUnavailable`].
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self, StoreError> {
        let conn = match mode {
            OpenMode::ReadOnly => {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX
                        | OpenFlags::SQLITE_OPEN_URI,
                )?;
                conn.execute_batch(
                    "PRAGMA query_only = 1;
                     PRAGMA synchronous = 0;",
                )?;
                let journal: String =
                    conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                tracing::debug!("Opened {} read-only, journal mode {}", path.display(), journal);
                conn
            }
            OpenMode::ReadWrite => {
                let conn = Connection::open(path).map_err(|source| {
                    StoreError::WriteModeUnavailable { path: path.to_path_buf(), source }
                })?;
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = 1;
                     PRAGMA wal_autocheckpoint = 100;
                     PRAGMA busy_timeout = 5000;",
                )?;
                init_schema(&conn)?;
                tracing::debug!("Opened {} read-write", path.display());
                conn
            }
        };

        Ok(Self { conn, mode })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, mode: OpenMode::ReadWrite })
    }

    /// Shared connection for `path` and `mode` on the calling thread.
    ///
    /// Connections are cached per thread and released when the last handle
    /// is dropped.
    pub fn instance(path: &Path, mode: OpenMode) -> Result<Rc<Self>, StoreError> {
        let key = (path.to_path_buf(), mode);

        if let Some(db) = INSTANCES.with(|cache| cache.borrow().get(&key).and_then(Weak::upgrade))
        {
            return Ok(db);
        }

        let db = Rc::new(Self::open(path, mode)?);
        INSTANCES.with(|cache| {
            let mut cache = cache.borrow_mut();
            cache.retain(|_, handle| handle.strong_count() > 0);
            cache.insert(key, Rc::downgrade(&db));
        });
        Ok(db)
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Begin a transaction that commits when dropped, early returns included.
    pub fn transaction(&self) -> Result<Transaction<'_>, StoreError> {
        self.ensure_writable()?;
        let mut tx = self.conn.unchecked_transaction()?;
        tx.set_drop_behavior(DropBehavior::Commit);
        Ok(tx)
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        match self.mode {
            OpenMode::ReadWrite => Ok(()),
            OpenMode::ReadOnly => Err(StoreError::ReadOnly),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Title and mimetype of a resource, if recorded.
    pub fn resource_info(&self, resource: &str) -> Result<Option<ResourceInfo>, StoreError> {
        self.conn
            .query_row(
                "SELECT title, mimetype FROM ResourceInfo WHERE targettedResource = ?1",
                [resource],
                |row| Ok(ResourceInfo { title: row.get(0)?, mimetype: row.get(1)? }),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn mimetype_of(&self, resource: &str) -> Result<Option<String>, StoreError> {
        Ok(self.resource_info(resource)?.and_then(|info| info.mimetype))
    }

    /// Every activity the resource is linked to, whatever the agent.
    pub fn linked_activities(&self, resource: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT usedActivity FROM ResourceLink
             WHERE targettedResource = ?1 ORDER BY usedActivity",
        )?;
        let activities = stmt
            .query_map([resource], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(activities)
    }

    /// `(activity, agent)` of every link the resource still has.
    pub fn link_owners(&self, resource: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT usedActivity, initiatingAgent FROM ResourceLink
             WHERE targettedResource = ?1 ORDER BY usedActivity, initiatingAgent",
        )?;
        let owners = stmt
            .query_map([resource], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(owners)
    }

    pub fn score(
        &self,
        activity: &str,
        agent: &str,
        resource: &str,
    ) -> Result<Option<ScoreRow>, StoreError> {
        self.conn
            .query_row(
                "SELECT usedActivity, initiatingAgent, targettedResource, cachedScore, firstUpdate, lastUpdate
                 FROM ResourceScoreCache
                 WHERE usedActivity = ?1 AND initiatingAgent = ?2 AND targettedResource = ?3",
                params![activity, agent, resource],
                Self::row_to_score,
            )
            .optional()
            .map_err(Into::into)
    }

    fn row_to_score(row: &rusqlite::Row) -> Result<ScoreRow, rusqlite::Error> {
        Ok(ScoreRow {
            activity: row.get(0)?,
            agent: row.get(1)?,
            resource: row.get(2)?,
            score: row.get::<_, Option<f64>>(3)?.unwrap_or_default(),
            first_update: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
            last_update: row.get::<_, Option<i64>>(5)?.unwrap_or_default(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Usage
    // ─────────────────────────────────────────────────────────────────────────

    pub fn insert_event(
        &self,
        activity: &str,
        agent: &str,
        resource: &str,
        start: i64,
        end: i64,
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO ResourceEvent (usedActivity, initiatingAgent, targettedResource, start, end)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![activity, agent, resource, start, end],
        )?;
        Ok(())
    }

    /// Add `delta` to the cached score and return the updated row.
    pub fn add_score(
        &self,
        activity: &str,
        agent: &str,
        resource: &str,
        delta: f64,
        now: i64,
    ) -> Result<ScoreRow, StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO ResourceScoreCache
                (usedActivity, initiatingAgent, targettedResource, scoreType, cachedScore, firstUpdate, lastUpdate)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)
             ON CONFLICT(usedActivity, initiatingAgent, targettedResource) DO UPDATE SET
                cachedScore = cachedScore + excluded.cachedScore,
                lastUpdate = excluded.lastUpdate",
            params![activity, agent, resource, delta, now],
        )?;

        self.score(activity, agent, resource)?
            .ok_or(StoreError::Database(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Distinct (activity, agent) pairs holding scores for resources matching
    /// the `GLOB` pattern.
    pub fn score_owners(
        &self,
        activity: Option<&str>,
        agent: Option<&str>,
        resource_glob: &str,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT usedActivity, initiatingAgent FROM ResourceScoreCache
             WHERE (?1 IS NULL OR usedActivity = ?1)
               AND (?2 IS NULL OR initiatingAgent = ?2)
               AND targettedResource GLOB ?3
             ORDER BY usedActivity, initiatingAgent",
        )?;
        let owners = stmt
            .query_map(params![activity, agent, resource_glob], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(owners)
    }

    /// Delete scores and events of resources matching the `GLOB` pattern.
    /// `None` stands for every activity or agent.
    pub fn delete_stats(
        &self,
        activity: Option<&str>,
        agent: Option<&str>,
        resource_glob: &str,
    ) -> Result<usize, StoreError> {
        self.ensure_writable()?;
        let scores = self.conn.execute(
            "DELETE FROM ResourceScoreCache
             WHERE (?1 IS NULL OR usedActivity = ?1)
               AND (?2 IS NULL OR initiatingAgent = ?2)
               AND targettedResource GLOB ?3",
            params![activity, agent, resource_glob],
        )?;
        self.conn.execute(
            "DELETE FROM ResourceEvent
             WHERE (?1 IS NULL OR usedActivity = ?1)
               AND (?2 IS NULL OR initiatingAgent = ?2)
               AND targettedResource GLOB ?3",
            params![activity, agent, resource_glob],
        )?;
        Ok(scores)
    }

    /// Delete everything recorded after `since`.
    pub fn delete_stats_since(&self, activity: Option<&str>, since: i64) -> Result<usize, StoreError> {
        self.ensure_writable()?;
        let scores = self.conn.execute(
            "DELETE FROM ResourceScoreCache
             WHERE (?1 IS NULL OR usedActivity = ?1) AND firstUpdate > ?2",
            params![activity, since],
        )?;
        self.conn.execute(
            "DELETE FROM ResourceEvent WHERE (?1 IS NULL OR usedActivity = ?1) AND start > ?2",
            params![activity, since],
        )?;
        Ok(scores)
    }

    /// Delete everything last touched before `before`.
    pub fn delete_stats_before(
        &self,
        activity: Option<&str>,
        before: i64,
    ) -> Result<usize, StoreError> {
        self.ensure_writable()?;
        let scores = self.conn.execute(
            "DELETE FROM ResourceScoreCache
             WHERE (?1 IS NULL OR usedActivity = ?1) AND lastUpdate < ?2",
            params![activity, before],
        )?;
        self.conn.execute(
            "DELETE FROM ResourceEvent WHERE (?1 IS NULL OR usedActivity = ?1) AND end < ?2",
            params![activity, before],
        )?;
        Ok(scores)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Links
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns false when the link already existed.
    pub fn insert_link(&self, activity: &str, agent: &str, resource: &str) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO ResourceLink (usedActivity, initiatingAgent, targettedResource)
             VALUES (?1, ?2, ?3)",
            params![activity, agent, resource],
        )?;
        Ok(rows > 0)
    }

    /// Returns false when there was no such link.
    pub fn delete_link(&self, activity: &str, agent: &str, resource: &str) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let rows = self.conn.execute(
            "DELETE FROM ResourceLink
             WHERE usedActivity = ?1 AND initiatingAgent = ?2 AND targettedResource = ?3",
            params![activity, agent, resource],
        )?;
        Ok(rows > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resource info
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_title(&self, resource: &str, title: &str) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO ResourceInfo (targettedResource, title, autoTitle, autoMimetype)
             VALUES (?1, ?2, 0, 1)
             ON CONFLICT(targettedResource) DO UPDATE SET title = excluded.title, autoTitle = 0",
            params![resource, title],
        )?;
        Ok(())
    }

    pub fn set_mimetype(&self, resource: &str, mimetype: &str) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO ResourceInfo (targettedResource, mimetype, autoTitle, autoMimetype)
             VALUES (?1, ?2, 1, 0)
             ON CONFLICT(targettedResource) DO UPDATE SET mimetype = excluded.mimetype, autoMimetype = 0",
            params![resource, mimetype],
        )?;
        Ok(())
    }
}
