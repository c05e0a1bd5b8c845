//! Outbound calls to the activity manager.
//!
//! The activity manager owns every write to the resources database. This
//! module abstracts its link and statistics-cleaning interface behind
//! [`StatsService`]; [`LocalStatsService`] implements it in process.

pub mod cleaning;
pub mod local;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

pub use cleaning::{forget_earlier_stats, forget_recent_stats, forget_resource, forget_resources};
pub use local::LocalStatsService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Current activity is not known yet")]
    ActivityNotReady,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No stats service connected")]
    NotConnected,
}

/// Unit for [`StatsService::delete_recent_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Hours,
    Days,
    Months,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "h",
            Self::Days => "d",
            Self::Months => "m",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            "m" | "month" | "months" => Ok(Self::Months),
            other => Err(format!("unknown time unit '{other}'")),
        }
    }
}

/// Link management and statistics cleaning.
///
/// Activity and agent arguments may be special tags (`:current`, `:global`,
/// `:any`); implementations resolve them.
pub trait StatsService {
    fn link_resource_to_activity(
        &self,
        agent: &str,
        resource: &str,
        activity: &str,
    ) -> Result<(), ServiceError>;

    fn unlink_resource_from_activity(
        &self,
        agent: &str,
        resource: &str,
        activity: &str,
    ) -> Result<(), ServiceError>;

    /// `resource` may be a `*` glob.
    fn delete_stats_for_resource(
        &self,
        activity: &str,
        agent: &str,
        resource: &str,
    ) -> Result<(), ServiceError>;

    fn delete_recent_stats(
        &self,
        activity: &str,
        count: u32,
        unit: TimeUnit,
    ) -> Result<(), ServiceError>;

    fn delete_earlier_stats(&self, activity: &str, months: u32) -> Result<(), ServiceError>;
}
