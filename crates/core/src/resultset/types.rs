//! Result records.

use serde::{Deserialize, Serialize};

/// Whether a resource is known to be linked to an activity.
///
/// Variants are declared in ascending order so that the derived `Ord`
/// sorts `Linked > Unknown > NotLinked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    NotLinked = 0,
    Unknown = 1,
    Linked = 2,
}

impl LinkStatus {
    pub fn from_i64(value: i64) -> Self {
        match value {
            2 => Self::Linked,
            0 => Self::NotLinked,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLinked => "not-linked",
            Self::Unknown => "unknown",
            Self::Linked => "linked",
        }
    }
}

/// One resource returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub resource: String,
    pub title: String,
    pub mimetype: String,
    pub score: f64,
    pub last_update: u32,
    pub first_update: u32,
    pub link_status: LinkStatus,
    pub linked_activities: Vec<String>,
    pub agent: String,
}

impl ResultRecord {
    /// A bare record with the resource doubling as its title.
    pub fn new(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self {
            title: resource.clone(),
            resource,
            mimetype: String::new(),
            score: 0.0,
            last_update: 0,
            first_update: 0,
            link_status: LinkStatus::Unknown,
            linked_activities: Vec::new(),
            agent: String::new(),
        }
    }
}

/// Store timestamps are signed; records carry them unsigned.
pub(crate) fn to_timestamp(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
