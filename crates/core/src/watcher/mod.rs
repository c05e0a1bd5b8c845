//! Live matching of change events against a query.
//!
//! A [`ResultWatcher`] decides, per inbound [`StatsEvent`], whether the
//! event concerns its query and translates it into a
//! [`WatcherNotification`]. Matching uses the same [`Filters`] the SQL
//! compiler renders, checked in cost order: agent, activity, resource glob,
//! then type and title, which need a store lookup done at most once per
//! event.

pub mod debounce;
pub mod events;

use std::cell::OnceCell;
use std::time::{Duration, Instant};

use crate::context::StatsContext;
use crate::filters::Filters;
use crate::pattern::has_wildcard;
use crate::query::Query;
use crate::query::terms::Select;
use crate::store::ResourceInfo;

pub use debounce::Debouncer;
pub use events::{StatsEvent, WatcherNotification};

/// Default coalescing window for bulk invalidations.
pub const DEFAULT_INVALIDATION_DEBOUNCE: Duration = Duration::from_millis(200);

/// Lazily fetched info about the resource of the event being matched.
struct ResourceLookup<'a> {
    ctx: &'a StatsContext,
    resource: &'a str,
    info: OnceCell<Option<ResourceInfo>>,
}

impl<'a> ResourceLookup<'a> {
    fn new(ctx: &'a StatsContext, resource: &'a str) -> Self {
        Self { ctx, resource, info: OnceCell::new() }
    }

    fn info(&self) -> Option<&ResourceInfo> {
        self.info
            .get_or_init(|| {
                let db = self.ctx.database()?;
                db.resource_info(self.resource).unwrap_or_else(|e| {
                    tracing::warn!("Cannot look up {}: {}", self.resource, e);
                    None
                })
            })
            .as_ref()
    }

    fn mimetype(&self) -> Option<&str> {
        self.info().and_then(|i| i.mimetype.as_deref())
    }

    fn title(&self) -> &str {
        self.info().and_then(|i| i.title.as_deref()).unwrap_or(self.resource)
    }
}

/// Filters the event stream for one query.
#[derive(Debug)]
pub struct ResultWatcher {
    query: Query,
    filters: Filters,
    ctx: StatsContext,
    invalidation: Debouncer,
}

impl ResultWatcher {
    pub fn new(query: Query, ctx: StatsContext, debounce: Duration) -> Self {
        let filters = Filters::new(&query, ctx.application());
        Self { query, filters, ctx, invalidation: Debouncer::new(debounce) }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Whether a bulk invalidation is waiting to fire.
    pub fn invalidation_pending(&self) -> bool {
        self.invalidation.is_active()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.invalidation.deadline()
    }

    /// Drop a pending invalidation, for example after a full reset.
    pub fn cancel_invalidation(&mut self) {
        self.invalidation.cancel();
    }

    /// Fires the debounced invalidation once it is due.
    pub fn poll(&mut self, now: Instant) -> Option<WatcherNotification> {
        self.invalidation.poll(now).then_some(WatcherNotification::Invalidated)
    }

    fn schedule_invalidation(&mut self, now: Instant) {
        tracing::debug!("Scheduling invalidation of {}", self.query);
        self.invalidation.schedule(now);
    }

    fn current_activity(&self) -> Option<String> {
        self.ctx.current_activity()
    }

    fn agent_matches(&self, agent: &str) -> bool {
        self.filters.agent_matches(agent)
    }

    fn activity_matches(&self, activity: &str) -> bool {
        self.filters.activity_matches(activity, self.current_activity().as_deref())
    }

    fn url_matches(&self, resource: &str) -> bool {
        self.filters.url_matches(resource)
    }

    fn type_matches(&self, lookup: &ResourceLookup<'_>) -> bool {
        self.filters.accepts_any_type() || self.filters.type_matches(lookup.mimetype())
    }

    fn title_matches(&self, lookup: &ResourceLookup<'_>) -> bool {
        self.filters.accepts_any_title() || self.filters.title_matches(lookup.title())
    }

    /// Full match for an event carrying an agent, a resource and an activity.
    pub fn event_matches(&self, agent: &str, resource: &str, activity: &str) -> bool {
        let lookup = ResourceLookup::new(&self.ctx, resource);
        let matched = self.agent_matches(agent)
            && self.activity_matches(activity)
            && self.url_matches(resource)
            && self.type_matches(&lookup)
            && self.title_matches(&lookup);
        tracing::trace!(agent, resource, activity, matched, "Matched event");
        matched
    }

    /// Translate `event`, or `None` if it does not concern the query.
    pub fn process(&mut self, event: &StatsEvent, now: Instant) -> Option<WatcherNotification> {
        let selection = self.query.selection();

        match event {
            StatsEvent::ResourceScoreUpdated {
                activity,
                agent,
                resource,
                score,
                last_update,
                first_update,
            } => (selection != Select::LinkedResources
                && self.event_matches(agent, resource, activity))
            .then(|| WatcherNotification::ScoreUpdated {
                resource: resource.clone(),
                score: *score,
                last_update: *last_update,
                first_update: *first_update,
            }),

            StatsEvent::ResourceScoreDeleted { activity, agent, resource } => {
                if selection == Select::LinkedResources
                    || !self.activity_matches(activity)
                    || !self.agent_matches(agent)
                {
                    return None;
                }

                if has_wildcard(resource) {
                    self.schedule_invalidation(now);
                    return None;
                }

                let lookup = ResourceLookup::new(&self.ctx, resource);
                // A pending reload will drop the entry anyway.
                (self.url_matches(resource)
                    && self.type_matches(&lookup)
                    && !self.invalidation.is_active())
                .then(|| WatcherNotification::Removed { resource: resource.clone() })
            }

            StatsEvent::RecentStatsDeleted { .. } | StatsEvent::EarlierStatsDeleted { .. } => {
                if selection != Select::LinkedResources {
                    self.schedule_invalidation(now);
                }
                None
            }

            StatsEvent::ResourceLinked { agent, resource, activity } => (selection
                != Select::UsedResources
                && self.event_matches(agent, resource, activity))
            .then(|| WatcherNotification::Linked { resource: resource.clone() }),

            StatsEvent::ResourceUnlinked { agent, resource, activity } => (selection
                != Select::UsedResources
                && self.event_matches(agent, resource, activity))
            .then(|| WatcherNotification::Unlinked { resource: resource.clone() }),

            StatsEvent::ResourceRemoved { resource } => {
                let lookup = ResourceLookup::new(&self.ctx, resource);
                (self.url_matches(resource) && self.type_matches(&lookup))
                    .then(|| WatcherNotification::Removed { resource: resource.clone() })
            }

            StatsEvent::ResourceTitleChanged { resource, title } => {
                Some(WatcherNotification::TitleChanged {
                    resource: resource.clone(),
                    title: title.clone(),
                })
            }

            StatsEvent::ResourceMimetypeChanged { resource, mimetype } => {
                Some(WatcherNotification::MimetypeChanged {
                    resource: resource.clone(),
                    mimetype: mimetype.clone(),
                })
            }

            StatsEvent::CurrentActivityChanged { .. } => None,
        }
    }
}
