mod common;

use std::rc::Rc;
use std::str::FromStr;

use actstats_core::activity::SharedActivity;
use actstats_core::context::StatsContext;
use actstats_core::query::Query;
use actstats_core::query::terms::{Activity, Agent, Date, Limit, Offset, Order, Select, Title, Type, Url};
use actstats_core::resultset::{LinkStatus, QueryError, ResultSet};
use common::Fixture;
use rstest::rstest;

fn resources(query: &Query, ctx: &StatsContext) -> Vec<String> {
    ResultSet::open(query, ctx).unwrap().iter().map(|r| r.resource).collect()
}

#[test]
fn empty_linked_set_for_application() {
    let fx = Fixture::seeded();
    let results = ResultSet::open(&Query::new(Select::LinkedResources), &fx.ctx()).unwrap();
    assert!(results.is_active());
    assert!(results.is_empty());
    assert_eq!(results.iter().count(), 0);
}

#[test]
fn used_by_gvim_in_current_activity() {
    let fx = Fixture::seeded();
    let query = Select::UsedResources | Order::HighScoredFirst | Agent::from("gvim");
    assert_eq!(
        resources(&query, &fx.ctx()),
        vec![
            "/path/high1_act1_gvim",
            "/path/high4_act1_gvim",
            "/path/mid2_act1_gvim",
            "/path/mid1_act1_gvim",
            "/path/low3_act1_gvim",
        ]
    );
}

#[test]
fn linked_resources_tie_break_alphabetically() {
    let fx = Fixture::seeded();
    let query = Select::LinkedResources | Agent::from("gvim") | Activity::from("activity1");
    let results = ResultSet::open(&query, &fx.ctx()).unwrap();

    assert_eq!(results.len(), 2);
    let first = results.at(0).unwrap();
    assert_eq!(first.resource, "/path/mid1_a1");
    assert_eq!(first.link_status, LinkStatus::Linked);
    assert_eq!(first.linked_activities, vec!["activity1"]);
    assert_eq!(results.at(1).unwrap().resource, "/path/mid2_a1");
}

#[test]
fn default_used_query_runs_as_application() {
    let fx = Fixture::seeded();
    let results = ResultSet::open(&Query::new(Select::UsedResources), &fx.ctx()).unwrap();

    let found: Vec<String> = results.iter().map(|r| r.resource).collect();
    assert_eq!(
        found,
        vec!["/path/high5_act1_kast", "/path/high7_act1_kast", "/path/high8_act1_kast"]
    );
    assert!(results.at(3).is_none());
    assert_eq!(results.at(0).unwrap().link_status, LinkStatus::Unknown);
}

#[rstest]
#[case::global_agent(
    Select::UsedResources | Agent::from(":global"),
    &["/path/mid6_act1_glob", "/path/mid7_act1_glob", "/path/mid8_act1_glob"]
)]
#[case::any_agent_any_activity(
    Select::UsedResources | Agent::from(":any") | Activity::from(":any") | Limit(3),
    &["/path/high1_act1_gvim", "/path/high2_act2_kate", "/path/high3_act1_kate"]
)]
#[case::single_day(
    Select::UsedResources | Agent::from(":any") | Activity::from(":any")
        | Date::from_str("2015-01-15").unwrap(),
    &["/path/high1_act1_gvim"]
)]
#[case::day_range(
    Select::UsedResources | Agent::from(":any") | Activity::from(":any")
        | Date::from_str("2015-01-14,2015-01-15").unwrap(),
    &["/path/high1_act1_gvim", "/path/high2_act2_kate"]
)]
#[case::title_glob(
    Select::UsedResources | Agent::from(":any") | Activity::from(":any") | Title::from("high*"),
    &["/path/high1_act1_gvim", "/path/high2_act2_kate"]
)]
#[case::mimetype(
    Select::UsedResources | Agent::from(":any") | Activity::from(":any") | Type::from("text/plain"),
    &["/path/high1_act1_gvim", "/path/high2_act2_kate"]
)]
#[case::url_glob(
    Select::UsedResources | Agent::from("gvim") | Url::from("/path/mid*"),
    &["/path/mid2_act1_gvim", "/path/mid1_act1_gvim"]
)]
#[case::recently_used(
    Select::UsedResources | Agent::from("gvim") | Order::RecentlyUsedFirst | Limit(2),
    &["/path/high1_act1_gvim", "/path/high4_act1_gvim"]
)]
#[case::page(
    Select::UsedResources | Agent::from("gvim") | Limit(2) | Offset(2),
    &["/path/mid2_act1_gvim", "/path/mid1_act1_gvim"]
)]
fn filtered_queries(#[case] query: Query, #[case] expected: &[&str]) {
    let fx = Fixture::seeded();
    assert_eq!(resources(&query, &fx.ctx()), expected);
}

#[test]
fn top_two_for_agent() {
    let fx = Fixture::empty();
    fx.exec(
        "INSERT INTO ResourceScoreCache
            (usedActivity, initiatingAgent, targettedResource, scoreType, cachedScore, firstUpdate, lastUpdate)
         VALUES
              ('activity1', 'gvim', 'r1', 0, 800, 1, 10)
            , ('activity1', 'gvim', 'r2', 0, 700, 1, 10)
            , ('activity1', 'gvim', 'r3', 0, 600, 1, 10)
            , ('activity1', 'gvim', 'r4', 0, 500, 1, 10);",
    );

    let query = Select::UsedResources | Order::HighScoredFirst | Agent::from("gvim") | Limit(2);
    assert_eq!(resources(&query, &fx.ctx()), vec!["r1", "r2"]);
}

#[test]
fn linked_resource_in_named_activity() {
    let fx = Fixture::empty();
    fx.exec(
        "INSERT INTO ResourceLink (usedActivity, initiatingAgent, targettedResource)
         VALUES ('a1', 'KActivitiesStatsTest', 'r5');",
    );

    let results =
        ResultSet::open(&(Select::LinkedResources | Activity::from("a1")), &fx.ctx()).unwrap();
    let found: Vec<_> = results.iter().collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].resource, "r5");
    assert_eq!(found[0].link_status, LinkStatus::Linked);
}

#[test]
fn union_keeps_linked_copy_once() {
    let fx = Fixture::seeded();
    fx.exec(
        "INSERT INTO ResourceLink (usedActivity, initiatingAgent, targettedResource)
         VALUES ('activity1', 'gvim', '/path/high1_act1_gvim');",
    );

    let query = Select::AllResources | Agent::from("gvim");
    let results: Vec<_> = ResultSet::open(&query, &fx.ctx()).unwrap().iter().collect();

    let high1: Vec<_> = results.iter().filter(|r| r.resource == "/path/high1_act1_gvim").collect();
    assert_eq!(high1.len(), 1);
    assert_eq!(high1[0].link_status, LinkStatus::Linked);
    assert_eq!(high1[0].score, 800.0);
    assert_eq!(high1[0].title, "high1_act1_gvim");

    let order: Vec<&str> = results.iter().map(|r| r.resource.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "/path/high1_act1_gvim",
            "/path/mid1_a1",
            "/path/mid2_a1",
            "/path/high4_act1_gvim",
            "/path/mid2_act1_gvim",
            "/path/mid1_act1_gvim",
            "/path/low3_act1_gvim",
        ]
    );
    assert!(results[3..].iter().all(|r| r.link_status == LinkStatus::NotLinked));
}

#[test]
fn iterates_both_ways() {
    let fx = Fixture::seeded();
    let query = Select::UsedResources | Agent::from("gvim");
    let results = ResultSet::open(&query, &fx.ctx()).unwrap();

    assert_eq!(results.iter().len(), 5);
    assert_eq!(results.iter().next_back().unwrap().resource, "/path/low3_act1_gvim");
    assert_eq!(results.iter().nth(1).unwrap().resource, "/path/high4_act1_gvim");
}

#[test]
fn unknown_current_activity_is_reported() {
    let fx = Fixture::seeded();
    let ctx = StatsContext::new("app", Rc::new(SharedActivity::new()), Some(fx.db.clone()));

    let err = ResultSet::open(&Query::new(Select::UsedResources), &ctx).unwrap_err();
    assert!(matches!(err, QueryError::ActivityNotReady));

    let any = Select::UsedResources | Agent::from(":any") | Activity::from(":any");
    assert!(!ResultSet::open(&any, &ctx).unwrap().is_empty());
}

#[test]
fn missing_store_degrades_to_inactive() {
    let ctx = StatsContext::new("app", Rc::new(SharedActivity::with_current("a1")), None);
    let results = ResultSet::open(&Query::default(), &ctx).unwrap();
    assert!(!results.is_active());
    assert!(results.is_empty());
}

#[test]
fn unreadable_store_degrades_to_inactive() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = StatsContext::open(
        "app",
        Rc::new(SharedActivity::with_current("a1")),
        &dir.path().join("missing/database"),
    );
    assert!(ctx.database().is_none());
    assert!(!ResultSet::open(&Query::default(), &ctx).unwrap().is_active());
}
