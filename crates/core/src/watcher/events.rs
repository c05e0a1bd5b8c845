//! Inbound change events and the notifications derived from them.

use serde::{Deserialize, Serialize};

use crate::service::TimeUnit;

/// A change reported by the activity manager.
///
/// Serialized as JSON objects tagged by `event`, one per line on the wire:
///
/// ```json
/// {"event":"resource-linked","agent":"gvim","resource":"/tmp/a","activity":"a1"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum StatsEvent {
    ResourceScoreUpdated {
        activity: String,
        agent: String,
        resource: String,
        score: f64,
        last_update: u32,
        first_update: u32,
    },
    /// Stats of one resource, or of every resource matching a `*` glob.
    ResourceScoreDeleted {
        activity: String,
        agent: String,
        resource: String,
    },
    RecentStatsDeleted {
        activity: String,
        count: u32,
        unit: TimeUnit,
    },
    EarlierStatsDeleted {
        activity: String,
        months: u32,
    },
    ResourceLinked {
        agent: String,
        resource: String,
        activity: String,
    },
    ResourceUnlinked {
        agent: String,
        resource: String,
        activity: String,
    },
    ResourceRemoved {
        resource: String,
    },
    ResourceTitleChanged {
        resource: String,
        title: String,
    },
    ResourceMimetypeChanged {
        resource: String,
        mimetype: String,
    },
    CurrentActivityChanged {
        activity: String,
    },
}

/// What a watcher forwards to its model.
#[derive(Debug, Clone, PartialEq)]
pub enum WatcherNotification {
    ScoreUpdated {
        resource: String,
        score: f64,
        last_update: u32,
        first_update: u32,
    },
    Removed {
        resource: String,
    },
    Linked {
        resource: String,
    },
    Unlinked {
        resource: String,
    },
    TitleChanged {
        resource: String,
        title: String,
    },
    MimetypeChanged {
        resource: String,
        mimetype: String,
    },
    /// The whole result is stale and must be reloaded.
    Invalidated,
}
