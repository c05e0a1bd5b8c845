//! Access to the resources database maintained by the activity manager.
//!
//! The database holds four tables: usage scores (`ResourceScoreCache`),
//! explicit links (`ResourceLink`), titles and mimetypes (`ResourceInfo`)
//! and the raw access log (`ResourceEvent`).
//!
//! # Example
//!
//! ```no_run
//! use actstats_core::store::{OpenMode, ResourcesDb};
//! use std::path::Path;
//!
//! let db = ResourcesDb::instance(Path::new("resources/database"), OpenMode::ReadOnly).unwrap();
//! let activities = db.linked_activities("/home/user/notes.txt").unwrap();
//! ```

pub mod db;
pub mod schema;
pub mod types;

pub use db::{OpenMode, ResourcesDb, StoreError};
pub use schema::{SCHEMA_VERSION, SchemaError, init_schema};
pub use types::{ResourceInfo, ScoreRow};
