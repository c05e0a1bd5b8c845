//! Building blocks for queries.
//!
//! Every term can be combined with a [`Query`] (or a bare [`Select`]) using
//! the `|` operator:
//!
//! ```
//! use actstats_core::query::terms::{Agent, Limit, Order, Select};
//!
//! let query = Select::UsedResources | Order::HighScoredFirst | Agent::from("gvim") | Limit(2);
//! assert_eq!(query.limit(), 2);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::BitOr;
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Query;
use super::special::{
    ANY_ACTIVITY_TAG, ANY_AGENT_TAG, ANY_TYPE_TAG, CURRENT_ACTIVITY_TAG,
    CURRENT_AGENT_TAG, DIRECTORIES_TYPE_TAG, FILES_TYPE_TAG, GLOBAL_ACTIVITY_TAG,
    GLOBAL_AGENT_TAG,
};

/// Ordering in which the results of a query are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Order {
    /// Resources with the highest scores first.
    #[default]
    HighScoredFirst,
    /// Recently used resources first.
    RecentlyUsedFirst,
    /// Recently created resources first.
    RecentlyCreatedFirst,
    /// Alphabetically by resource.
    OrderByUrl,
    /// Alphabetically by title.
    OrderByTitle,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighScoredFirst => "HighScore",
            Self::RecentlyUsedFirst => "RecentlyUsed",
            Self::RecentlyCreatedFirst => "RecentlyCreated",
            Self::OrderByUrl => "ByUrl",
            Self::OrderByTitle => "ByTitle",
        }
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "highscoredfirst" | "highscore" | "score" => Ok(Self::HighScoredFirst),
            "recentlyusedfirst" | "recentlyused" | "used" => Ok(Self::RecentlyUsedFirst),
            "recentlycreatedfirst" | "recentlycreated" | "created" => {
                Ok(Self::RecentlyCreatedFirst)
            }
            "orderbyurl" | "url" | "resource" => Ok(Self::OrderByUrl),
            "orderbytitle" | "title" => Ok(Self::OrderByTitle),
            other => Err(format!("unknown ordering '{other}'")),
        }
    }
}

/// Which resources a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Select {
    /// Resources linked to an activity, or globally.
    LinkedResources,
    /// Resources that have been accessed.
    UsedResources,
    /// Combined set of accessed and linked resources.
    #[default]
    AllResources,
}

impl Select {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkedResources => "LinkedResources",
            Self::UsedResources => "UsedResources",
            Self::AllResources => "AllResources",
        }
    }
}

impl FromStr for Select {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linked" | "linkedresources" => Ok(Self::LinkedResources),
            "used" | "usedresources" => Ok(Self::UsedResources),
            "all" | "allresources" => Ok(Self::AllResources),
            other => Err(format!("unknown selection '{other}'")),
        }
    }
}

/// How many items to return. Zero means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub u32);

impl Limit {
    pub fn all() -> Self {
        Self(0)
    }
}

/// How many items to skip. Only meaningful together with a finite [`Limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub u32);

/// Names one dimension of a [`Values`] filter.
pub trait Dimension {
    const NAME: &'static str;
}

/// A list of filter values for one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Values<D> {
    pub values: Vec<String>,
    _dimension: PhantomData<D>,
}

impl<D> Values<D> {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { values: values.into_iter().map(Into::into).collect(), _dimension: PhantomData }
    }
}

impl<D> From<&str> for Values<D> {
    fn from(value: &str) -> Self {
        Self::new([value])
    }
}

impl<D> From<String> for Values<D> {
    fn from(value: String) -> Self {
        Self::new([value])
    }
}

impl<D> From<Vec<String>> for Values<D> {
    fn from(values: Vec<String>) -> Self {
        Self { values, _dimension: PhantomData }
    }
}

impl<D, const N: usize> From<[&str; N]> for Values<D> {
    fn from(values: [&str; N]) -> Self {
        Self::new(values)
    }
}

impl<D: Dimension> fmt::Display for Values<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", D::NAME, self.values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDimension;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentDimension;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityDimension;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlDimension;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleDimension;

impl Dimension for TypeDimension {
    const NAME: &'static str = "Type";
}
impl Dimension for AgentDimension {
    const NAME: &'static str = "Agent";
}
impl Dimension for ActivityDimension {
    const NAME: &'static str = "Activity";
}
impl Dimension for UrlDimension {
    const NAME: &'static str = "Url";
}
impl Dimension for TitleDimension {
    const NAME: &'static str = "Title";
}

/// Filters resources by mimetype.
pub type Type = Values<TypeDimension>;
/// Filters resources by the agent (application) that accessed or linked them.
pub type Agent = Values<AgentDimension>;
/// Filters resources by the activity they were accessed in or linked to.
pub type Activity = Values<ActivityDimension>;
/// Filters resources by a glob over the resource identifier.
pub type Url = Values<UrlDimension>;
/// Filters resources by a glob over their title.
pub type Title = Values<TitleDimension>;

impl Type {
    /// Resources of any type.
    pub fn any() -> Self {
        Self::from(ANY_TYPE_TAG)
    }

    /// Non-directory resources.
    pub fn files() -> Self {
        Self::from(FILES_TYPE_TAG)
    }

    /// Directory resources.
    pub fn directories() -> Self {
        Self::from(DIRECTORIES_TYPE_TAG)
    }
}

impl Agent {
    pub fn any() -> Self {
        Self::from(ANY_AGENT_TAG)
    }

    /// Resources not tied to a specific agent.
    pub fn global() -> Self {
        Self::from(GLOBAL_AGENT_TAG)
    }

    /// Resources accessed or linked by the calling application.
    pub fn current() -> Self {
        Self::from(CURRENT_AGENT_TAG)
    }
}

impl Activity {
    pub fn any() -> Self {
        Self::from(ANY_ACTIVITY_TAG)
    }

    /// Resources linked to all activities.
    pub fn global() -> Self {
        Self::from(GLOBAL_ACTIVITY_TAG)
    }

    /// Resources of the activity that is current when the query runs.
    pub fn current() -> Self {
        Self::from(CURRENT_ACTIVITY_TAG)
    }
}

impl Url {
    /// Resources starting with the given prefix.
    pub fn starts_with(prefix: &str) -> Self {
        Self::from(format!("{prefix}*"))
    }

    /// Resources containing the given infix.
    pub fn contains(infix: &str) -> Self {
        Self::from(format!("*{infix}*"))
    }

    /// Local files.
    pub fn local_file() -> Self {
        Self::from("/*")
    }

    /// Local files plus the common network file protocols.
    pub fn file() -> Self {
        Self::from(["/*", "smb:*", "fish:*", "sftp:*", "ftp:*"])
    }
}

/// Restricts results to resources accessed on a day or within an
/// inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl Date {
    pub fn on(day: NaiveDate) -> Self {
        Self { start: day, end: None }
    }

    /// Inclusive range; the bounds are swapped when given in reverse.
    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: Some(start) }
        } else {
            Self { start, end: Some(end) }
        }
    }

    pub fn today() -> Self {
        Self::on(Local::now().date_naive())
    }

    pub fn yesterday() -> Self {
        Self::on(Local::now().date_naive() - Duration::days(1))
    }

    /// The last seven days up to and including today.
    pub fn current_week() -> Self {
        let today = Local::now().date_naive();
        Self::range(today - Duration::days(7), today)
    }

    /// The seven days before [`Date::current_week`].
    pub fn previous_week() -> Self {
        let end = Local::now().date_naive() - Duration::days(7);
        Self::range(end - Duration::days(7), end)
    }
}

impl FromStr for Date {
    type Err = chrono::ParseError;

    /// Parses `YYYY-MM-DD` or `YYYY-MM-DD,YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(',') {
            Some((start, end)) => Ok(Self::range(
                NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")?,
                NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")?,
            )),
            None => Ok(Self::on(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)),
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{},{}", self.start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
            None => write!(f, "{}", self.start.format("%Y-%m-%d")),
        }
    }
}

/// Anything that can be folded into a [`Query`].
pub trait Term {
    fn apply_to(self, query: &mut Query);
}

impl Term for Select {
    fn apply_to(self, query: &mut Query) {
        query.set_selection(self);
    }
}

impl Term for Order {
    fn apply_to(self, query: &mut Query) {
        query.set_ordering(self);
    }
}

impl Term for Limit {
    fn apply_to(self, query: &mut Query) {
        query.set_limit(self.0);
    }
}

impl Term for Offset {
    fn apply_to(self, query: &mut Query) {
        query.set_offset(self.0);
    }
}

impl Term for Type {
    fn apply_to(self, query: &mut Query) {
        query.add_types(self.values);
    }
}

impl Term for Agent {
    fn apply_to(self, query: &mut Query) {
        query.add_agents(self.values);
    }
}

impl Term for Activity {
    fn apply_to(self, query: &mut Query) {
        query.add_activities(self.values);
    }
}

impl Term for Url {
    fn apply_to(self, query: &mut Query) {
        query.add_url_filters(self.values);
    }
}

impl Term for Title {
    fn apply_to(self, query: &mut Query) {
        query.add_title_filters(self.values);
    }
}

impl Term for Date {
    fn apply_to(self, query: &mut Query) {
        query.set_date(Some(self));
    }
}

impl<T: Term> BitOr<T> for Query {
    type Output = Query;

    fn bitor(mut self, term: T) -> Query {
        term.apply_to(&mut self);
        self
    }
}

impl<T: Term> BitOr<T> for &Query {
    type Output = Query;

    fn bitor(self, term: T) -> Query {
        self.clone() | term
    }
}

impl<T: Term> BitOr<T> for Select {
    type Output = Query;

    fn bitor(self, term: T) -> Query {
        Query::new(self) | term
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_terms() {
        assert_eq!(Type::files().values, vec![":files"]);
        assert_eq!(Agent::current().values, vec![":current"]);
        assert_eq!(Activity::global().values, vec![":global"]);
        assert_eq!(Url::starts_with("/home").values, vec!["/home*"]);
        assert_eq!(Url::contains("kde").values, vec!["*kde*"]);
        assert_eq!(Url::file().values.len(), 5);
        assert_eq!(Limit::all(), Limit(0));
    }

    #[test]
    fn test_date_parsing() {
        let single: Date = "2015-01-15".parse().unwrap();
        assert_eq!(single.start, NaiveDate::from_ymd_opt(2015, 1, 15).unwrap());
        assert!(single.end.is_none());

        let range: Date = "2015-01-15,2015-01-14".parse().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2015, 1, 14).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2015, 1, 15));
        assert_eq!(range.to_string(), "2015-01-14,2015-01-15");

        assert!("15/01/2015".parse::<Date>().is_err());
    }

    #[test]
    fn test_current_week_is_ordered() {
        let week = Date::current_week();
        assert!(week.start < week.end.unwrap());
        let previous = Date::previous_week();
        assert_eq!(previous.end, Some(week.start));
    }

    #[test]
    fn test_order_and_select_parsing() {
        assert_eq!("score".parse::<Order>().unwrap(), Order::HighScoredFirst);
        assert_eq!("recently-used".parse::<Order>().unwrap(), Order::RecentlyUsedFirst);
        assert_eq!("title".parse::<Order>().unwrap(), Order::OrderByTitle);
        assert_eq!("linked".parse::<Select>().unwrap(), Select::LinkedResources);
        assert!("sideways".parse::<Select>().is_err());
    }
}
