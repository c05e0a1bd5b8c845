//! Query definitions.
//!
//! A [`Query`] is an immutable-by-convention value describing which
//! resources to list and in what order. It is usually built by combining
//! [`terms`] with the `|` operator; combining never mutates the left-hand
//! side when it is borrowed.

pub mod special;
pub mod terms;

use std::fmt;

use special::{ANY_PATTERN, ANY_TYPE_TAG, CURRENT_ACTIVITY_TAG, CURRENT_AGENT_TAG};
use terms::{Date, Order, Select};

/// Description of a resource query.
#[derive(Debug, Clone, Default)]
pub struct Query {
    selection: Select,
    types: Vec<String>,
    agents: Vec<String>,
    activities: Vec<String>,
    url_filters: Vec<String>,
    title_filters: Vec<String>,
    ordering: Order,
    date: Option<Date>,
    limit: u32,
    offset: u32,
}

fn or_default(values: &[String], default: &str) -> Vec<String> {
    if values.is_empty() { vec![default.to_string()] } else { values.to_vec() }
}

impl Query {
    pub fn new(selection: Select) -> Self {
        Self { selection, ..Default::default() }
    }

    pub fn selection(&self) -> Select {
        self.selection
    }

    /// Mimetype filters, `[":any"]` when none were given.
    pub fn types(&self) -> Vec<String> {
        or_default(&self.types, ANY_TYPE_TAG)
    }

    /// Agent filters, `[":current"]` when none were given.
    pub fn agents(&self) -> Vec<String> {
        or_default(&self.agents, CURRENT_AGENT_TAG)
    }

    /// Activity filters, `[":current"]` when none were given.
    pub fn activities(&self) -> Vec<String> {
        or_default(&self.activities, CURRENT_ACTIVITY_TAG)
    }

    /// Resource globs, `["*"]` when none were given.
    pub fn url_filters(&self) -> Vec<String> {
        or_default(&self.url_filters, ANY_PATTERN)
    }

    /// Title globs, `["*"]` when none were given.
    pub fn title_filters(&self) -> Vec<String> {
        or_default(&self.title_filters, ANY_PATTERN)
    }

    pub fn ordering(&self) -> Order {
        self.ordering
    }

    pub fn date(&self) -> Option<Date> {
        self.date
    }

    /// Maximum number of results, zero meaning unbounded.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of results to skip.
    ///
    /// # Panics
    ///
    /// An offset is only meaningful with a finite limit; reading it from a
    /// query without one is a programming error.
    pub fn offset(&self) -> u32 {
        assert!(self.limit > 0, "Query::offset: offset can only be specified if limit is set");
        self.offset
    }

    /// Offset, or `None` when the query has no limit.
    pub fn try_offset(&self) -> Option<u32> {
        (self.limit > 0).then_some(self.offset)
    }

    /// Whether the activity filter depends on the current activity.
    pub fn uses_current_activity(&self) -> bool {
        self.activities().iter().any(|a| a == CURRENT_ACTIVITY_TAG)
    }

    pub fn set_selection(&mut self, selection: Select) {
        self.selection = selection;
    }

    pub fn set_ordering(&mut self, ordering: Order) {
        self.ordering = ordering;
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
    }

    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    pub fn set_date(&mut self, date: Option<Date>) {
        self.date = date;
    }

    pub fn add_types<I: IntoIterator<Item = String>>(&mut self, types: I) {
        self.types.extend(types);
    }

    pub fn add_agents<I: IntoIterator<Item = String>>(&mut self, agents: I) {
        self.agents.extend(agents);
    }

    pub fn add_activities<I: IntoIterator<Item = String>>(&mut self, activities: I) {
        self.activities.extend(activities);
    }

    /// Adds resource globs. Single quotes are stripped.
    pub fn add_url_filters<I: IntoIterator<Item = String>>(&mut self, filters: I) {
        self.url_filters.extend(filters.into_iter().map(|f| f.replace('\'', "")));
    }

    pub fn add_title_filters<I: IntoIterator<Item = String>>(&mut self, filters: I) {
        self.title_filters.extend(filters);
    }

    pub fn clear_types(&mut self) {
        self.types.clear();
    }

    pub fn clear_agents(&mut self) {
        self.agents.clear();
    }

    pub fn clear_activities(&mut self) {
        self.activities.clear();
    }

    pub fn clear_url_filters(&mut self) {
        self.url_filters.clear();
    }

    pub fn clear_title_filters(&mut self) {
        self.title_filters.clear();
    }

    pub fn remove_types(&mut self, types: &[&str]) {
        self.types.retain(|t| !types.contains(&t.as_str()));
    }

    pub fn remove_agents(&mut self, agents: &[&str]) {
        self.agents.retain(|a| !agents.contains(&a.as_str()));
    }

    pub fn remove_activities(&mut self, activities: &[&str]) {
        self.activities.retain(|a| !activities.contains(&a.as_str()));
    }

    pub fn remove_url_filters(&mut self, filters: &[&str]) {
        self.url_filters.retain(|u| !filters.contains(&u.as_str()));
    }

    pub fn remove_title_filters(&mut self, filters: &[&str]) {
        self.title_filters.retain(|t| !filters.contains(&t.as_str()));
    }
}

/// Two queries are equal when they select the same resources; ordering and
/// pagination are not compared.
impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.selection == other.selection
            && self.types() == other.types()
            && self.agents() == other.agents()
            && self.activities() == other.activities()
            && self.url_filters() == other.url_filters()
            && self.title_filters() == other.title_filters()
            && self.date == other.date
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Query {{ {}, Type: {:?}, Agent: {:?}, Activity: {:?}, Url: {:?}, Title: {:?}, Date: {}, {}, Limit: {} }}",
            self.selection.as_str(),
            self.types(),
            self.agents(),
            self.activities(),
            self.url_filters(),
            self.title_filters(),
            self.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            self.ordering.as_str(),
            self.limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::terms::{Activity, Agent, Limit, Offset, Type, Url};
    use super::*;

    #[test]
    fn test_defaults() {
        let query = Query::default();

        assert_eq!(query.selection(), Select::AllResources);
        assert_eq!(query.types(), vec![":any"]);
        assert_eq!(query.agents(), vec![":current"]);
        assert_eq!(query.activities(), vec![":current"]);
        assert_eq!(query.url_filters(), vec!["*"]);
        assert_eq!(query.ordering(), Order::HighScoredFirst);
        assert_eq!(query.limit(), 0);
        assert!(query.uses_current_activity());
    }

    #[test]
    fn test_derivation_from_default() {
        let default_query = Query::default();
        let mut derived = &default_query | Select::LinkedResources;

        assert_eq!(default_query.selection(), Select::AllResources);
        assert_eq!(derived.selection(), Select::LinkedResources);

        derived.set_selection(Select::AllResources);
        assert_eq!(default_query, derived);
    }

    #[test]
    fn test_derivation_from_custom() {
        let custom = Select::LinkedResources | Agent::from(["gvim", "kate"]) | Limit(10);
        let derived = &custom | Activity::any() | Type::files();

        assert_eq!(custom.activities(), vec![":current"]);
        assert_eq!(derived.agents(), vec!["gvim", "kate"]);
        assert_eq!(derived.activities(), vec![":any"]);
        assert_eq!(derived.types(), vec![":files"]);
        assert_eq!(derived.limit(), 10);
        assert_ne!(custom, derived);
    }

    #[test]
    fn test_terms_accumulate() {
        let query = Select::UsedResources
            | Agent::from("gvim")
            | Agent::from("kate")
            | Url::from("/home/*")
            | Limit(5)
            | Offset(10);

        assert_eq!(query.agents(), vec!["gvim", "kate"]);
        assert_eq!(query.offset(), 10);
        assert_eq!(query.try_offset(), Some(10));
    }

    #[test]
    fn test_url_filters_strip_quotes() {
        let query = Query::default() | Url::from("/it's/*");
        assert_eq!(query.url_filters(), vec!["/its/*"]);
    }

    #[test]
    fn test_clear_and_remove() {
        let mut query = Query::default() | Agent::from(["a", "b", "c"]);
        query.remove_agents(&["b"]);
        assert_eq!(query.agents(), vec!["a", "c"]);
        query.clear_agents();
        assert_eq!(query.agents(), vec![":current"]);
    }

    #[test]
    #[should_panic(expected = "offset can only be specified if limit is set")]
    fn test_offset_without_limit_is_contract_violation() {
        let mut query = Query::default();
        query.set_offset(5);
        let _ = query.offset();
    }

    #[test]
    fn test_try_offset_without_limit() {
        let query = Query::default() | Offset(5);
        assert_eq!(query.try_offset(), None);
    }

    #[test]
    fn test_display() {
        let query = Select::UsedResources | Agent::from("gvim") | Limit(2);
        let text = query.to_string();
        assert!(text.starts_with("Query { UsedResources"));
        assert!(text.contains("\"gvim\""));
        assert!(text.ends_with("Limit: 2 }"));
    }
}
