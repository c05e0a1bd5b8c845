//! In-process stats service.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Months, Utc};

use crate::activity::ActivityContext;
use crate::query::special::{
    ANY_ACTIVITY_TAG, ANY_AGENT_TAG, CURRENT_ACTIVITY_TAG, CURRENT_AGENT_TAG,
};
use crate::store::{ResourcesDb, ScoreRow};
use crate::watcher::StatsEvent;

use super::{ServiceError, StatsService, TimeUnit};

type Result<T> = std::result::Result<T, ServiceError>;

/// Writes directly to a read-write [`ResourcesDb`].
///
/// Every write runs in its own transaction. The events the activity manager
/// would broadcast are queued and handed out by
/// [`take_events`](Self::take_events).
pub struct LocalStatsService {
    db: Rc<ResourcesDb>,
    activities: Rc<dyn ActivityContext>,
    application: String,
    events: RefCell<Vec<StatsEvent>>,
}

impl LocalStatsService {
    pub fn new(
        db: Rc<ResourcesDb>,
        activities: Rc<dyn ActivityContext>,
        application: impl Into<String>,
    ) -> Self {
        Self { db, activities, application: application.into(), events: RefCell::new(Vec::new()) }
    }

    pub fn database(&self) -> &Rc<ResourcesDb> {
        &self.db
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&self) -> Vec<StatsEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn emit(&self, event: StatsEvent) {
        tracing::debug!(?event, "Queued event");
        self.events.borrow_mut().push(event);
    }

    /// `None` stands for every activity.
    fn resolve_activity(&self, activity: &str) -> Result<Option<String>> {
        match activity {
            ANY_ACTIVITY_TAG => Ok(None),
            CURRENT_ACTIVITY_TAG => {
                self.activities.current_activity().map(Some).ok_or(ServiceError::ActivityNotReady)
            }
            other => Ok(Some(other.to_string())),
        }
    }

    fn resolve_agent(&self, agent: &str) -> Option<String> {
        match agent {
            ANY_AGENT_TAG => None,
            CURRENT_AGENT_TAG => Some(self.application.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Activity and agent for a single-row write; wildcards are rejected.
    fn concrete(&self, activity: &str, agent: &str) -> Result<(String, String)> {
        let activity = self
            .resolve_activity(activity)?
            .ok_or_else(|| ServiceError::InvalidArgument("activity cannot be :any".into()))?;
        let agent = self
            .resolve_agent(agent)
            .ok_or_else(|| ServiceError::InvalidArgument("agent cannot be :any".into()))?;
        Ok((activity, agent))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recording
    // ─────────────────────────────────────────────────────────────────────────

    /// Record one access to `resource` now.
    pub fn record_usage(&self, activity: &str, agent: &str, resource: &str) -> Result<ScoreRow> {
        self.record_usage_at(activity, agent, resource, Utc::now())
    }

    /// Record one access at `when`, bumping the score by one.
    pub fn record_usage_at(
        &self,
        activity: &str,
        agent: &str,
        resource: &str,
        when: DateTime<Utc>,
    ) -> Result<ScoreRow> {
        let (activity, agent) = self.concrete(activity, agent)?;
        let now = when.timestamp();

        let row = {
            let _tx = self.db.transaction()?;
            self.db.insert_event(&activity, &agent, resource, now, now)?;
            self.db.add_score(&activity, &agent, resource, 1.0, now)?
        };

        self.emit(StatsEvent::ResourceScoreUpdated {
            activity,
            agent,
            resource: resource.to_string(),
            score: row.score,
            last_update: crate::resultset::types::to_timestamp(row.last_update),
            first_update: crate::resultset::types::to_timestamp(row.first_update),
        });
        Ok(row)
    }

    /// Set the title and/or mimetype of `resource`.
    pub fn set_resource_info(
        &self,
        resource: &str,
        title: Option<&str>,
        mimetype: Option<&str>,
    ) -> Result<()> {
        {
            let _tx = self.db.transaction()?;
            if let Some(title) = title {
                self.db.set_title(resource, title)?;
            }
            if let Some(mimetype) = mimetype {
                self.db.set_mimetype(resource, mimetype)?;
            }
        }

        if let Some(title) = title {
            self.emit(StatsEvent::ResourceTitleChanged {
                resource: resource.to_string(),
                title: title.to_string(),
            });
        }
        if let Some(mimetype) = mimetype {
            self.emit(StatsEvent::ResourceMimetypeChanged {
                resource: resource.to_string(),
                mimetype: mimetype.to_string(),
            });
        }
        Ok(())
    }

    fn cutoff(count: u32, unit: TimeUnit) -> i64 {
        let now = Utc::now();
        let then = match unit {
            TimeUnit::Hours => now - Duration::hours(i64::from(count)),
            TimeUnit::Days => now - Duration::days(i64::from(count)),
            TimeUnit::Months => now.checked_sub_months(Months::new(count)).unwrap_or(now),
        };
        then.timestamp()
    }
}

impl StatsService for LocalStatsService {
    fn link_resource_to_activity(&self, agent: &str, resource: &str, activity: &str) -> Result<()> {
        let (activity, agent) = self.concrete(activity, agent)?;

        let inserted = {
            let _tx = self.db.transaction()?;
            self.db.insert_link(&activity, &agent, resource)?
        };

        if inserted {
            self.emit(StatsEvent::ResourceLinked {
                agent,
                resource: resource.to_string(),
                activity,
            });
        }
        Ok(())
    }

    fn unlink_resource_from_activity(
        &self,
        agent: &str,
        resource: &str,
        activity: &str,
    ) -> Result<()> {
        let (activity, agent) = self.concrete(activity, agent)?;

        let removed = {
            let _tx = self.db.transaction()?;
            self.db.delete_link(&activity, &agent, resource)?
        };

        if removed {
            self.emit(StatsEvent::ResourceUnlinked {
                agent,
                resource: resource.to_string(),
                activity,
            });
        }
        Ok(())
    }

    fn delete_stats_for_resource(&self, activity: &str, agent: &str, resource: &str) -> Result<()> {
        let activity = self.resolve_activity(activity)?;
        let agent = self.resolve_agent(agent);
        let glob = crate::pattern::GlobPattern::new(resource).to_sql_glob();

        let owners = {
            let _tx = self.db.transaction()?;
            let owners = self.db.score_owners(activity.as_deref(), agent.as_deref(), &glob)?;
            self.db.delete_stats(activity.as_deref(), agent.as_deref(), &glob)?;
            owners
        };

        for (activity, agent) in owners {
            self.emit(StatsEvent::ResourceScoreDeleted {
                activity,
                agent,
                resource: resource.to_string(),
            });
        }
        Ok(())
    }

    fn delete_recent_stats(&self, activity: &str, count: u32, unit: TimeUnit) -> Result<()> {
        let resolved = self.resolve_activity(activity)?;
        {
            let _tx = self.db.transaction()?;
            self.db.delete_stats_since(resolved.as_deref(), Self::cutoff(count, unit))?;
        }

        self.emit(StatsEvent::RecentStatsDeleted {
            activity: resolved.unwrap_or_else(|| activity.to_string()),
            count,
            unit,
        });
        Ok(())
    }

    fn delete_earlier_stats(&self, activity: &str, months: u32) -> Result<()> {
        let resolved = self.resolve_activity(activity)?;
        {
            let _tx = self.db.transaction()?;
            self.db
                .delete_stats_before(resolved.as_deref(), Self::cutoff(months, TimeUnit::Months))?;
        }

        self.emit(StatsEvent::EarlierStatsDeleted {
            activity: resolved.unwrap_or_else(|| activity.to_string()),
            months,
        });
        Ok(())
    }
}
