//! SQLite schema of the resources database.
//!
//! The tables are owned by the activity manager service; this module only
//! creates them when they are missing so that local tools and tests can work
//! against a fresh file.

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema version {found} is newer than supported {supported}")]
    VersionTooNew { found: i32, supported: i32 },

    #[error("Invalid schema version: {0}")]
    InvalidVersion(String),
}

/// Create the tables when absent and verify the recorded version.
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    create_tables(conn)?;

    match get_schema_version(conn)? {
        0 => set_schema_version(conn, SCHEMA_VERSION)?,
        version if version > SCHEMA_VERSION => {
            return Err(SchemaError::VersionTooNew {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        _ => {}
    }

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='SchemaInfo'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let value: Option<String> = conn
        .query_row("SELECT value FROM SchemaInfo WHERE key = 'version'", [], |row| {
            row.get(0)
        })
        .optional()?;

    match value {
        None => Ok(0),
        Some(v) => v.trim().parse().map_err(|_| SchemaError::InvalidVersion(v)),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT OR REPLACE INTO SchemaInfo (key, value) VALUES ('version', ?1)",
        [version.to_string()],
    )?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS SchemaInfo (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        -- Raw access log, one row per open/close of a resource
        CREATE TABLE IF NOT EXISTS ResourceEvent (
            usedActivity TEXT,
            initiatingAgent TEXT,
            targettedResource TEXT,
            start INTEGER,
            end INTEGER
        );

        -- Accumulated usage score per (activity, agent, resource)
        CREATE TABLE IF NOT EXISTS ResourceScoreCache (
            usedActivity TEXT,
            initiatingAgent TEXT,
            targettedResource TEXT,
            scoreType INTEGER,
            cachedScore FLOAT,
            firstUpdate INTEGER,
            lastUpdate INTEGER,
            PRIMARY KEY(usedActivity, initiatingAgent, targettedResource)
        );

        -- Explicit links of resources to activities
        CREATE TABLE IF NOT EXISTS ResourceLink (
            usedActivity TEXT,
            initiatingAgent TEXT,
            targettedResource TEXT,
            PRIMARY KEY(usedActivity, initiatingAgent, targettedResource)
        );

        CREATE TABLE IF NOT EXISTS ResourceInfo (
            targettedResource TEXT,
            title TEXT,
            mimetype TEXT,
            autoTitle INTEGER,
            autoMimetype INTEGER,
            PRIMARY KEY(targettedResource)
        );

        CREATE INDEX IF NOT EXISTS ResourceEvent_target
            ON ResourceEvent (targettedResource, start);
        CREATE INDEX IF NOT EXISTS ResourceLink_target
            ON ResourceLink (targettedResource);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_init_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in ["ResourceEvent", "ResourceInfo", "ResourceLink", "ResourceScoreCache"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_init_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("UPDATE SchemaInfo SET value = '99' WHERE key = 'version'", []).unwrap();

        let err = init_schema(&conn).unwrap_err();
        assert!(matches!(err, SchemaError::VersionTooNew { found: 99, .. }));
    }
}
