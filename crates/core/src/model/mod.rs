//! Live, incrementally maintained view of a query.
//!
//! A [`ResultModel`] fetches its query in chunks, keeps the rows in a
//! [`Cache`] and applies change events to it in place. Every edit is
//! recorded as a [`ModelChange`] the presentation layer drains with
//! [`ResultModel::take_changes`].
//!
//! The model is driven from a single thread: feed it events with
//! [`ResultModel::handle_event`] and call [`ResultModel::poll`] whenever the
//! deadline from [`ResultModel::next_deadline`] passes.

pub mod cache;

use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use crate::config::ModelSettings;
use crate::context::StatsContext;
use crate::ordering::{ALL_ACTIVITIES_SCOPE, OrderingBroker, OrderingSubscription, scope_key};
use crate::query::Query;
use crate::query::special::{
    ANY_ACTIVITY_TAG, ANY_AGENT_TAG, CURRENT_AGENT_TAG, GLOBAL_ACTIVITY_TAG, GLOBAL_AGENT_TAG,
};
use crate::query::terms::{Activity, Agent, Limit, Offset, Order, Select};
use crate::resultset::{LinkStatus, OrderingSpec, QueryError, ResultRecord, ResultSet};
use crate::service::{ServiceError, StatsService, forget_resource, forget_resources};
use crate::watcher::{ResultWatcher, StatsEvent, WatcherNotification};

pub use cache::{Cache, ModelChange};

/// Lifecycle of a [`ResultModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Empty,
    /// Fetching, or waiting for the current activity to become known.
    Loading,
    Ready,
}

type Result<T> = std::result::Result<T, ServiceError>;

pub struct ResultModelBuilder {
    query: Query,
    ctx: StatsContext,
    settings: ModelSettings,
    service: Option<Rc<dyn StatsService>>,
    ordering: Option<OrderingSubscription>,
}

impl ResultModelBuilder {
    pub fn settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Service used for forgetting and linking.
    pub fn service(mut self, service: Rc<dyn StatsService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Enables user-defined ordering, shared with every model of `client_id`.
    pub fn ordering(mut self, broker: &OrderingBroker, client_id: &str) -> Self {
        self.ordering = Some(broker.subscribe(client_id));
        self
    }

    /// Builds the model and loads its first chunk.
    pub fn build(self) -> ResultModel {
        let watcher =
            ResultWatcher::new(self.query.clone(), self.ctx.clone(), self.settings.invalidation_debounce);
        let cache = Cache::new(
            OrderingSpec::new(self.query.ordering()),
            self.query.selection() != Select::UsedResources,
        );

        let mut model = ResultModel {
            query: self.query,
            ctx: self.ctx,
            settings: self.settings,
            watcher,
            service: self.service,
            ordering: self.ordering,
            cache,
            state: ModelState::Empty,
            has_more: false,
        };
        model.reset();
        model
    }
}

pub struct ResultModel {
    query: Query,
    ctx: StatsContext,
    settings: ModelSettings,
    watcher: ResultWatcher,
    service: Option<Rc<dyn StatsService>>,
    ordering: Option<OrderingSubscription>,
    cache: Cache,
    state: ModelState,
    has_more: bool,
}

impl ResultModel {
    pub fn builder(query: Query, ctx: StatsContext) -> ResultModelBuilder {
        ResultModelBuilder {
            query,
            ctx,
            settings: ModelSettings::default(),
            service: None,
            ordering: None,
        }
    }

    /// Model with default settings and neither service nor ordering.
    pub fn new(query: Query, ctx: StatsContext) -> Self {
        Self::builder(query, ctx).build()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn row_count(&self) -> usize {
        self.cache.len()
    }

    /// Copy of the row at `row`.
    pub fn get(&self, row: usize) -> Option<ResultRecord> {
        self.cache.get(row).cloned()
    }

    pub fn rows(&self) -> &[ResultRecord] {
        self.cache.items()
    }

    pub fn take_changes(&mut self) -> Vec<ModelChange> {
        self.cache.take_changes()
    }

    /// Current user-defined order of linked resources.
    pub fn fixed_order(&self) -> &[String] {
        self.cache.fixed()
    }

    fn capacity(&self) -> usize {
        match self.query.limit() {
            0 => usize::MAX,
            limit => limit as usize,
        }
    }

    pub fn can_fetch_more(&self) -> bool {
        self.state == ModelState::Ready && self.has_more && self.cache.len() < self.capacity()
    }

    pub fn fetch_more(&mut self) {
        if self.can_fetch_more() {
            self.fetch(self.cache.len(), self.settings.chunk_size);
        }
    }

    /// When [`poll`](Self::poll) next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watcher.next_deadline()
    }

    // ─── Loading ────────────────────────────────────────────────────────────

    fn ordering_scope(&self) -> String {
        if self.query.uses_current_activity() {
            scope_key(self.ctx.current_activity().as_deref())
        } else {
            ALL_ACTIVITIES_SCOPE.to_string()
        }
    }

    fn load_fixed_order(&mut self) {
        let Some(subscription) = &self.ordering else {
            return;
        };
        let scope = self.ordering_scope();

        match subscription.load(&scope) {
            Ok(Some(order)) => self.cache.set_fixed(order),
            Ok(None) => {
                // A scope seen for the first time starts from the order in use.
                if !self.cache.fixed().is_empty() {
                    if let Err(e) = subscription.seed(&scope, self.cache.fixed()) {
                        tracing::warn!("Cannot store ordering for {}: {}", scope, e);
                    }
                }
            }
            Err(e) => tracing::warn!("Cannot load ordering for {}: {}", scope, e),
        }
    }

    /// Drop everything and load the first chunk again.
    pub fn reset(&mut self) {
        tracing::debug!("Resetting model for {}", self.query);
        self.state = ModelState::Loading;
        self.watcher.cancel_invalidation();
        self.load_fixed_order();
        self.cache.clear();
        self.has_more = false;

        if self.fetch(0, self.settings.chunk_size) {
            self.state = ModelState::Ready;
        }
    }

    /// Refresh the held window, or reset when it grew too large.
    pub fn reload(&mut self) {
        let len = self.cache.len();
        if len > self.settings.reload_ceiling {
            self.reset();
        } else if len == 0 {
            self.fetch(0, self.settings.chunk_size);
        } else {
            self.fetch(0, len);
        }
    }

    /// Fetch `count` rows starting at row `from` and diff them into the
    /// cache. Returns false while the current activity is unknown.
    fn fetch(&mut self, from: usize, count: usize) -> bool {
        let count = count.min(self.capacity().saturating_sub(from));
        if count == 0 {
            self.has_more = false;
            return true;
        }

        let base = self.query.try_offset().unwrap_or(0) as usize;
        let query = &self.query
            | Limit(u32::try_from(count + 1).unwrap_or(u32::MAX))
            | Offset(u32::try_from(base + from).unwrap_or(u32::MAX));

        let results = match ResultSet::open(&query, &self.ctx) {
            Ok(results) => results,
            Err(QueryError::ActivityNotReady) => {
                tracing::debug!("Waiting for the current activity before loading");
                self.state = ModelState::Loading;
                return false;
            }
            Err(e) => {
                tracing::warn!("Cannot load results: {}", e);
                self.has_more = false;
                return true;
            }
        };

        let mut batch: Vec<ResultRecord> = results.iter().collect();
        self.has_more = batch.len() > count;
        batch.truncate(count);
        batch.retain(|r| self.cache.find(&r.resource).is_none_or(|i| i >= from));

        self.cache.sort_batch(&mut batch);
        let fetched = batch.len();
        self.cache.replace(batch, from);
        self.forget_missing_files(from, fetched);
        true
    }

    /// Local files that vanished are removed here and forgotten upstream.
    fn forget_missing_files(&mut self, from: usize, count: usize) {
        let end = (from + count).min(self.cache.len());
        let missing: Vec<String> = self.cache.items()[from.min(end)..end]
            .iter()
            .filter(|r| r.resource.starts_with('/') && !Path::new(&r.resource).exists())
            .map(|r| r.resource.clone())
            .collect();

        for resource in missing {
            tracing::debug!("Dropping missing file {}", resource);
            if let Some(index) = self.cache.find(&resource) {
                self.cache.remove(index);
            }
            if self.service.is_some() {
                if let Err(e) = self.forget(&resource) {
                    tracing::warn!("Cannot forget {}: {}", resource, e);
                }
            }
        }
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    /// Apply an inbound change event.
    pub fn handle_event(&mut self, event: &StatsEvent, now: Instant) {
        if let StatsEvent::CurrentActivityChanged { activity } = event {
            if self.state == ModelState::Loading || self.query.uses_current_activity() {
                tracing::debug!("Current activity is now {}", activity);
                self.reset();
            }
            return;
        }

        if self.state != ModelState::Ready {
            return;
        }

        if let Some(notification) = self.watcher.process(event, now) {
            self.apply(notification);
        }
    }

    /// Fire due timers and pick up orderings changed by sibling models.
    pub fn poll(&mut self, now: Instant) {
        if self.ordering.as_ref().is_some_and(OrderingSubscription::take_stale) {
            tracing::debug!("Ordering changed by a sibling, resetting");
            self.reset();
        }

        if let Some(notification) = self.watcher.poll(now) {
            self.apply(notification);
        }
    }

    fn apply(&mut self, notification: WatcherNotification) {
        match notification {
            WatcherNotification::ScoreUpdated { resource, score, last_update, first_update } => {
                self.on_score_updated(&resource, score, last_update, first_update);
            }
            WatcherNotification::Removed { resource } => self.on_removed(&resource),
            WatcherNotification::Linked { resource } => self.on_linked(&resource),
            WatcherNotification::Unlinked { resource } => self.on_unlinked(&resource),
            WatcherNotification::TitleChanged { resource, title } => {
                if let Some(index) = self.cache.find(&resource) {
                    self.cache.update(index, |r| r.title = title);
                    if self.query.ordering() == Order::OrderByTitle {
                        self.cache.reposition(index);
                    }
                }
            }
            WatcherNotification::MimetypeChanged { resource, mimetype } => {
                if let Some(index) = self.cache.find(&resource) {
                    self.cache.update(index, |r| r.mimetype = mimetype);
                }
            }
            WatcherNotification::Invalidated => self.reload(),
        }
    }

    /// Title, mimetype and links for a row the store did not hand us.
    fn backfill(&self, record: &mut ResultRecord) {
        let Some(db) = self.ctx.database() else {
            return;
        };
        match db.resource_info(&record.resource) {
            Ok(Some(info)) => {
                if let Some(title) = info.title {
                    record.title = title;
                }
                if let Some(mimetype) = info.mimetype {
                    record.mimetype = mimetype;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Cannot look up {}: {}", record.resource, e),
        }
        self.refresh_links(record);
    }

    fn refresh_links(&self, record: &mut ResultRecord) {
        let Some(db) = self.ctx.database() else {
            return;
        };
        match db.linked_activities(&record.resource) {
            Ok(activities) => record.linked_activities = activities,
            Err(e) => tracing::warn!("Cannot look up links of {}: {}", record.resource, e),
        }
    }

    /// Insert where the record belongs, unless that is past what we hold.
    fn insert_sorted(&mut self, record: ResultRecord) {
        let destination = self.cache.destination_for(&record);
        let capacity = self.capacity();

        if destination >= capacity || (destination == self.cache.len() && self.has_more) {
            self.has_more = true;
            return;
        }

        self.cache.insert(destination, record);
        if self.cache.len() > capacity {
            self.cache.truncate(capacity);
            self.has_more = true;
        }
    }

    fn on_score_updated(&mut self, resource: &str, score: f64, last_update: u32, first_update: u32) {
        if let Some(index) = self.cache.find(resource) {
            self.cache.update(index, |r| {
                r.score = score;
                r.last_update = last_update;
                r.first_update = first_update;
            });
            self.cache.reposition(index);
            return;
        }

        let mut record = ResultRecord::new(resource);
        record.score = score;
        record.last_update = last_update;
        record.first_update = first_update;
        record.link_status = match self.query.selection() {
            Select::UsedResources => LinkStatus::Unknown,
            _ => LinkStatus::NotLinked,
        };
        self.backfill(&mut record);
        self.insert_sorted(record);
    }

    fn on_linked(&mut self, resource: &str) {
        if let Some(index) = self.cache.find(resource) {
            let mut links = Vec::new();
            if let Some(record) = self.cache.get(index) {
                let mut record = record.clone();
                self.refresh_links(&mut record);
                links = record.linked_activities;
            }
            self.cache.update(index, |r| {
                r.link_status = LinkStatus::Linked;
                r.linked_activities = links;
            });
            self.cache.reposition(index);
            return;
        }

        let mut record = ResultRecord::new(resource);
        record.link_status = LinkStatus::Linked;
        self.backfill(&mut record);
        self.insert_sorted(record);
    }

    fn on_unlinked(&mut self, resource: &str) {
        let Some(index) = self.cache.find(resource) else {
            return;
        };
        let Some(mut record) = self.cache.get(index).cloned() else {
            return;
        };
        self.refresh_links(&mut record);

        if self.still_linked_in_query(resource) {
            self.cache.update(index, |r| r.linked_activities = record.linked_activities);
            return;
        }

        match self.query.selection() {
            Select::LinkedResources => {
                self.cache.remove(index);
                if self.has_more {
                    self.fetch(self.cache.len(), 1);
                }
            }
            Select::AllResources => self.reload(),
            Select::UsedResources => {}
        }
    }

    /// Whether a remaining link matches both the agent and activity filters.
    fn still_linked_in_query(&self, resource: &str) -> bool {
        let Some(db) = self.ctx.database() else {
            return false;
        };
        let owners = match db.link_owners(resource) {
            Ok(owners) => owners,
            Err(e) => {
                tracing::warn!("Cannot look up links of {}: {}", resource, e);
                return false;
            }
        };

        let current = self.ctx.current_activity();
        let filters = self.watcher.filters();
        owners.iter().any(|(activity, agent)| {
            filters.agent_matches(agent) && filters.activity_matches(activity, current.as_deref())
        })
    }

    fn on_removed(&mut self, resource: &str) {
        let Some(index) = self.cache.find(resource) else {
            return;
        };
        let linked = self.cache.get(index).is_some_and(|r| r.link_status == LinkStatus::Linked);
        if self.query.selection() == Select::UsedResources || !linked {
            self.cache.remove(index);
            if self.has_more {
                self.fetch(self.cache.len(), 1);
            }
        }
    }

    // ─── Ordering ───────────────────────────────────────────────────────────

    /// Pin `resource` at `position` among the linked resources.
    ///
    /// Every linked resource currently shown becomes pinned in its current
    /// order. The new order is persisted and sibling models reload.
    pub fn set_fixed_position(&mut self, resource: &str, position: usize) {
        let Some(subscription) = &self.ordering else {
            tracing::warn!("Cannot reorder {}: the model was built without a client id", resource);
            return;
        };

        if self.cache.fixed().iter().position(|r| r == resource) == Some(position) {
            return;
        }

        let cached = self.cache.find(resource);
        if cached
            .and_then(|i| self.cache.get(i))
            .is_some_and(|r| r.link_status == LinkStatus::NotLinked)
        {
            return;
        }

        let mut fixed = self.cache.linked_prefix();
        fixed.retain(|r| r != resource);
        fixed.insert(position.min(fixed.len()), resource.to_string());

        let scope = self.ordering_scope();
        if let Err(e) = subscription.store(&scope, &fixed) {
            tracing::warn!("Cannot store ordering for {}: {}", scope, e);
        }

        self.cache.set_fixed(fixed);
        if let Some(index) = cached {
            self.cache.reposition(index);
        }
    }

    // ─── Forgetting and linking ─────────────────────────────────────────────

    fn service(&self) -> Result<&dyn StatsService> {
        self.service.as_deref().ok_or(ServiceError::NotConnected)
    }

    fn resolved_agents(&self) -> Agent {
        let application = self.ctx.application();
        Agent::new(
            self.query
                .agents()
                .into_iter()
                .map(|a| if a == CURRENT_AGENT_TAG { application.to_string() } else { a }),
        )
    }

    /// Forget `resource` for every activity and agent of the query.
    pub fn forget(&self, resource: &str) -> Result<()> {
        let activities = Activity::new(self.query.activities());
        forget_resource(self.service()?, &activities, &self.resolved_agents(), resource)
    }

    pub fn forget_row(&self, row: usize) -> Result<()> {
        let Some(record) = self.cache.get(row) else {
            return Err(ServiceError::InvalidArgument(format!("no row {row}")));
        };
        self.forget(&record.resource)
    }

    /// Forget everything the query could return.
    pub fn forget_all(&self) -> Result<()> {
        let mut query = self.query.clone();
        query.clear_agents();
        query.add_agents(self.resolved_agents().values);
        forget_resources(self.service()?, &query)
    }

    /// Link targets: the given values, else the query's. `:any` links globally.
    fn link_targets(&self, activity: Option<Activity>, agent: Option<Agent>) -> (Vec<String>, Vec<String>) {
        let activities = activity
            .map(|a| a.values)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.query.activities())
            .into_iter()
            .map(|a| if a == ANY_ACTIVITY_TAG { GLOBAL_ACTIVITY_TAG.to_string() } else { a })
            .collect();
        let agents = agent
            .map(|a| a.values)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.resolved_agents().values)
            .into_iter()
            .map(|a| if a == ANY_AGENT_TAG { GLOBAL_AGENT_TAG.to_string() } else { a })
            .collect();
        (activities, agents)
    }

    pub fn link_to_activity(
        &self,
        resource: &str,
        activity: Option<Activity>,
        agent: Option<Agent>,
    ) -> Result<()> {
        let service = self.service()?;
        let (activities, agents) = self.link_targets(activity, agent);
        for activity in &activities {
            for agent in &agents {
                service.link_resource_to_activity(agent, resource, activity)?;
            }
        }
        Ok(())
    }

    pub fn unlink_from_activity(
        &self,
        resource: &str,
        activity: Option<Activity>,
        agent: Option<Agent>,
    ) -> Result<()> {
        let service = self.service()?;
        let (activities, agents) = self.link_targets(activity, agent);
        for activity in &activities {
            for agent in &agents {
                service.unlink_resource_from_activity(agent, resource, activity)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResultModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultModel")
            .field("query", &self.query)
            .field("state", &self.state)
            .field("rows", &self.cache.len())
            .field("has_more", &self.has_more)
            .finish_non_exhaustive()
    }
}
