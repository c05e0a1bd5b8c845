//! Translation of a [`Query`] into SQL over the resources database.
//!
//! Each selection mode has a template with named placeholders
//! (`$agentsFilter`, `$activitiesFilter`, `$urlFilter`, `$mimetypeFilter`,
//! `$titleFilter`, `$dateFilter`, `$resourceEventJoin`, `$orderingColumn`).
//! The placeholders are filled with clauses rendered by [`Filters`]; the
//! ordering chain and pagination are appended last.

use std::cmp::Ordering;

use crate::filters::{Filters, quote};
use crate::query::Query;
use crate::query::terms::{Date, Order, Select};

use super::QueryError;
use super::types::{LinkStatus, ResultRecord};

const LINKED_TEMPLATE: &str = "
    SELECT
          src.targettedResource AS resource
        , COALESCE(SUM(rsc.cachedScore), 0) AS score
        , COALESCE(MIN(rsc.firstUpdate), 0) AS firstUpdate
        , COALESCE(MAX(rsc.lastUpdate), 0) AS lastUpdate
        , COALESCE(ri.title, src.targettedResource) AS title
        , ri.mimetype AS mimetype
        , src.initiatingAgent AS agent
        , 2 AS linkStatus
    FROM ResourceLink src
    LEFT JOIN ResourceScoreCache rsc
        ON  src.targettedResource = rsc.targettedResource
        AND src.usedActivity      = rsc.usedActivity
        AND src.initiatingAgent   = rsc.initiatingAgent
    LEFT JOIN ResourceInfo ri
        ON src.targettedResource = ri.targettedResource
    $resourceEventJoin
    WHERE
        ($agentsFilter)
        AND ($activitiesFilter)
        AND ($urlFilter)
        AND ($mimetypeFilter)
        AND ($titleFilter)
    GROUP BY resource
";

const USED_TEMPLATE: &str = "
    SELECT
          src.targettedResource AS resource
        , COALESCE(SUM(src.cachedScore), 0) AS score
        , COALESCE(MIN(src.firstUpdate), 0) AS firstUpdate
        , COALESCE(MAX(src.lastUpdate), 0) AS lastUpdate
        , COALESCE(ri.title, src.targettedResource) AS title
        , ri.mimetype AS mimetype
        , src.initiatingAgent AS agent
        , $usedLinkStatus AS linkStatus
    FROM ResourceScoreCache src
    LEFT JOIN ResourceInfo ri
        ON src.targettedResource = ri.targettedResource
    $resourceEventJoin
    WHERE
        ($agentsFilter)
        AND ($activitiesFilter)
        AND ($urlFilter)
        AND ($mimetypeFilter)
        AND ($titleFilter)
    GROUP BY resource
";

const ALL_TEMPLATE: &str = "
    WITH
    LinkedResourcesResults AS ($linkedQuery),
    UsedResourcesResults AS ($usedQuery),
    CollectedResults AS (
        SELECT * FROM LinkedResourcesResults
        UNION
        SELECT * FROM UsedResourcesResults
        WHERE resource NOT IN (SELECT resource FROM LinkedResourcesResults)
    )
    SELECT
          resource
        , SUM(score) AS score
        , MIN(firstUpdate) AS firstUpdate
        , MAX(lastUpdate) AS lastUpdate
        , title
        , mimetype
        , agent
        , MAX(linkStatus) AS linkStatus
    FROM CollectedResults
    GROUP BY resource
";

const RESOURCE_EVENT_JOIN: &str = "
    JOIN (
        SELECT usedActivity, initiatingAgent, targettedResource
        FROM ResourceEvent
        WHERE $dateFilter
        GROUP BY usedActivity, initiatingAgent, targettedResource
    ) re
        ON  src.targettedResource = re.targettedResource
        AND src.usedActivity      = re.usedActivity
        AND src.initiatingAgent   = re.initiatingAgent
";

/// How the link and usage tables are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    LinkedOnly,
    UsedOnly,
    /// Both, with the linked row winning when a resource is in both.
    Union,
}

/// The ordering chain shared by SQL and in-memory comparisons:
/// link status descending, the requested metric, then resource ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingSpec {
    order: Order,
}

impl OrderingSpec {
    pub fn new(order: Order) -> Self {
        Self { order }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Leading `ORDER BY` terms, each followed by a comma.
    pub fn ordering_column(&self) -> &'static str {
        match self.order {
            Order::HighScoredFirst => "linkStatus DESC, score DESC,",
            Order::RecentlyUsedFirst => "linkStatus DESC, lastUpdate DESC,",
            Order::RecentlyCreatedFirst => "linkStatus DESC, firstUpdate DESC,",
            Order::OrderByTitle => "linkStatus DESC, title ASC,",
            Order::OrderByUrl => "linkStatus DESC,",
        }
    }

    pub fn order_by(&self) -> String {
        format!("ORDER BY {} resource ASC", self.ordering_column())
    }

    /// Metric followed by the resource tiebreak, ignoring link status.
    pub fn compare_metric(&self, a: &ResultRecord, b: &ResultRecord) -> Ordering {
        let metric = match self.order {
            Order::HighScoredFirst => b.score.total_cmp(&a.score),
            Order::RecentlyUsedFirst => b.last_update.cmp(&a.last_update),
            Order::RecentlyCreatedFirst => b.first_update.cmp(&a.first_update),
            Order::OrderByTitle => a.title.cmp(&b.title),
            Order::OrderByUrl => Ordering::Equal,
        };
        metric.then_with(|| a.resource.cmp(&b.resource))
    }

    /// The full chain.
    pub fn compare(&self, a: &ResultRecord, b: &ResultRecord) -> Ordering {
        b.link_status.cmp(&a.link_status).then_with(|| self.compare_metric(a, b))
    }
}

/// Output of [`compile`].
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub ordering: OrderingSpec,
    pub combinator: Combinator,
}

fn date_clause(date: &Date) -> String {
    let day = "DATE(start, 'unixepoch')";
    match date.end {
        None => format!("{day} = {}", quote(&date.start.format("%Y-%m-%d").to_string())),
        Some(end) => format!(
            "{day} >= {} AND {day} <= {}",
            quote(&date.start.format("%Y-%m-%d").to_string()),
            quote(&end.format("%Y-%m-%d").to_string()),
        ),
    }
}

/// Compile `query` for the given application and current activity.
///
/// Fails only when the query needs the current activity and it is unknown.
pub fn compile(
    query: &Query,
    application: &str,
    current_activity: Option<&str>,
) -> Result<CompiledQuery, QueryError> {
    let filters = Filters::new(query, application);

    let activities = filters
        .activities_clause("src.usedActivity", current_activity)
        .ok_or(QueryError::ActivityNotReady)?;

    let event_join = match query.date() {
        Some(date) => RESOURCE_EVENT_JOIN.replace("$dateFilter", &date_clause(&date)),
        None => String::new(),
    };

    let fill = |template: &str, used_link_status: LinkStatus| -> String {
        template
            .replace("$resourceEventJoin", &event_join)
            .replace("$agentsFilter", &filters.agents_clause("src.initiatingAgent"))
            .replace("$activitiesFilter", &activities)
            .replace("$urlFilter", &filters.urls_clause("src.targettedResource"))
            .replace("$mimetypeFilter", &filters.types_clause("ri.mimetype"))
            .replace(
                "$titleFilter",
                &filters.titles_clause("COALESCE(ri.title, src.targettedResource)"),
            )
            .replace("$usedLinkStatus", &(used_link_status as i32).to_string())
    };

    let (body, combinator) = match query.selection() {
        Select::LinkedResources => (fill(LINKED_TEMPLATE, LinkStatus::Linked), Combinator::LinkedOnly),
        Select::UsedResources => (fill(USED_TEMPLATE, LinkStatus::Unknown), Combinator::UsedOnly),
        Select::AllResources => (
            ALL_TEMPLATE
                .replace("$linkedQuery", &fill(LINKED_TEMPLATE, LinkStatus::Linked))
                .replace("$usedQuery", &fill(USED_TEMPLATE, LinkStatus::NotLinked)),
            Combinator::Union,
        ),
    };

    let ordering = OrderingSpec::new(query.ordering());
    let mut sql = format!("{}\n    {}", body.trim_end(), ordering.order_by());

    if let Some(offset) = query.try_offset() {
        sql.push_str(&format!("\n    LIMIT {} OFFSET {}", query.limit(), offset));
    }

    Ok(CompiledQuery { sql, ordering, combinator })
}
