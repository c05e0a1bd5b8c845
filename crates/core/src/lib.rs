#![allow(clippy::module_name_repetitions)]

//! Activity-scoped resource usage statistics.
//!
//! Queries are built from terms ([`query::terms`]), compiled to SQL over the
//! activity manager's resources database and run once through a
//! [`resultset::ResultSet`], or kept live through a [`model::ResultModel`]
//! that follows change events.

pub mod activity;
pub mod config;
pub mod context;
pub mod filters;
pub mod model;
pub mod ordering;
pub mod pattern;
pub mod query;
pub mod resultset;
pub mod service;
pub mod store;
pub mod watcher;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
