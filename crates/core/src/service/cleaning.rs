//! Bulk forgetting of statistics.
//!
//! Each helper fans a request out over every combination of the given
//! activities and agents.

use crate::query::Query;
use crate::query::terms::{Activity, Agent};

use super::{ServiceError, StatsService, TimeUnit};

/// Forget `resource` for every activity x agent pair.
pub fn forget_resource(
    service: &dyn StatsService,
    activities: &Activity,
    agents: &Agent,
    resource: &str,
) -> Result<(), ServiceError> {
    for activity in &activities.values {
        for agent in &agents.values {
            service.delete_stats_for_resource(activity, agent, resource)?;
        }
    }
    Ok(())
}

/// Forget everything `query` could return.
pub fn forget_resources(service: &dyn StatsService, query: &Query) -> Result<(), ServiceError> {
    let urls = query.url_filters();
    for activity in query.activities() {
        for agent in query.agents() {
            for url in &urls {
                service.delete_stats_for_resource(&activity, &agent, url)?;
            }
        }
    }
    Ok(())
}

pub fn forget_recent_stats(
    service: &dyn StatsService,
    activities: &Activity,
    count: u32,
    unit: TimeUnit,
) -> Result<(), ServiceError> {
    for activity in &activities.values {
        service.delete_recent_stats(activity, count, unit)?;
    }
    Ok(())
}

pub fn forget_earlier_stats(
    service: &dyn StatsService,
    activities: &Activity,
    months: u32,
) -> Result<(), ServiceError> {
    for activity in &activities.values {
        service.delete_earlier_stats(activity, months)?;
    }
    Ok(())
}
