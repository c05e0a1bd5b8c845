//! Per-dimension filter semantics.
//!
//! Each query dimension resolves its tokens once into a small enum. The same
//! value renders the SQL clause used by the result set and answers the
//! in-process `matches` check used by the watcher, so batch queries and live
//! events never disagree about what a token means.

use crate::pattern::GlobPattern;
use crate::query::Query;
use crate::query::special::{
    ANY_ACTIVITY_TAG, ANY_AGENT_TAG, ANY_TYPE_TAG, CURRENT_ACTIVITY_TAG, CURRENT_AGENT_TAG,
    DIRECTORIES_TYPE_TAG, DIRECTORY_MIMETYPE, FILES_TYPE_TAG,
};

/// SQL string literal with embedded quotes doubled.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn any_of(parts: Vec<String>) -> String {
    if parts.iter().any(|p| p == "1") {
        return "1".to_string();
    }
    match parts.len() {
        0 => "1".to_string(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => parts.iter().map(|p| format!("({p})")).collect::<Vec<_>>().join(" OR "),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentFilter {
    Any,
    Named(String),
}

impl AgentFilter {
    /// `:current` resolves to the calling application.
    pub fn resolve(token: &str, application: &str) -> Self {
        match token {
            ANY_AGENT_TAG => Self::Any,
            CURRENT_AGENT_TAG => Self::Named(application.to_string()),
            other => Self::Named(other.to_string()),
        }
    }

    pub fn sql(&self, column: &str) -> String {
        match self {
            Self::Any => "1".to_string(),
            Self::Named(agent) => format!("{column} = {}", quote(agent)),
        }
    }

    pub fn matches(&self, agent: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Named(name) => name == agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityFilter {
    Any,
    /// Resolved against the activity context every time it is used.
    Current,
    Named(String),
}

impl ActivityFilter {
    pub fn resolve(token: &str) -> Self {
        match token {
            ANY_ACTIVITY_TAG => Self::Any,
            CURRENT_ACTIVITY_TAG => Self::Current,
            other => Self::Named(other.to_string()),
        }
    }

    /// `None` when the filter needs the current activity and it is unknown.
    pub fn sql(&self, column: &str, current: Option<&str>) -> Option<String> {
        match self {
            Self::Any => Some("1".to_string()),
            Self::Current => current.map(|id| format!("{column} = {}", quote(id))),
            Self::Named(id) => Some(format!("{column} = {}", quote(id))),
        }
    }

    pub fn matches(&self, activity: &str, current: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Current => current == Some(activity),
            Self::Named(id) => id == activity,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeFilter {
    Any,
    Files,
    Directories,
    Pattern(GlobPattern),
}

impl TypeFilter {
    pub fn resolve(token: &str) -> Self {
        match token {
            ANY_TYPE_TAG => Self::Any,
            FILES_TYPE_TAG => Self::Files,
            DIRECTORIES_TYPE_TAG => Self::Directories,
            other => {
                let pattern = GlobPattern::new(other);
                if pattern.is_any() { Self::Any } else { Self::Pattern(pattern) }
            }
        }
    }

    pub fn sql(&self, column: &str) -> String {
        match self {
            Self::Any => "1".to_string(),
            Self::Files => {
                format!("{column} != {} AND {column} != ''", quote(DIRECTORY_MIMETYPE))
            }
            Self::Directories => format!("{column} = {}", quote(DIRECTORY_MIMETYPE)),
            Self::Pattern(p) => format!("{column} GLOB {}", quote(&p.to_sql_glob())),
        }
    }

    /// A resource without a known mimetype only passes the `:any` filter,
    /// which is how a NULL column behaves in SQL.
    pub fn matches(&self, mimetype: Option<&str>) -> bool {
        match (self, mimetype) {
            (Self::Any, _) => true,
            (_, None) => false,
            (Self::Files, Some(m)) => m != DIRECTORY_MIMETYPE && !m.is_empty(),
            (Self::Directories, Some(m)) => m == DIRECTORY_MIMETYPE,
            (Self::Pattern(p), Some(m)) => p.matches(m),
        }
    }
}

fn glob_sql(pattern: &GlobPattern, column: &str) -> String {
    if pattern.is_any() {
        "1".to_string()
    } else {
        format!("{column} GLOB {}", quote(&pattern.to_sql_glob()))
    }
}

/// Every dimension of a query, resolved.
#[derive(Debug, Clone)]
pub struct Filters {
    pub agents: Vec<AgentFilter>,
    pub activities: Vec<ActivityFilter>,
    pub types: Vec<TypeFilter>,
    pub urls: Vec<GlobPattern>,
    pub titles: Vec<GlobPattern>,
}

impl Filters {
    pub fn new(query: &Query, application: &str) -> Self {
        Self {
            agents: query.agents().iter().map(|a| AgentFilter::resolve(a, application)).collect(),
            activities: query.activities().iter().map(|a| ActivityFilter::resolve(a)).collect(),
            types: query.types().iter().map(|t| TypeFilter::resolve(t)).collect(),
            urls: query.url_filters().iter().map(|u| GlobPattern::new(u)).collect(),
            titles: query.title_filters().iter().map(|t| GlobPattern::new(t)).collect(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // SQL clauses
    // ─────────────────────────────────────────────────────────────────────────

    pub fn agents_clause(&self, column: &str) -> String {
        any_of(self.agents.iter().map(|a| a.sql(column)).collect())
    }

    pub fn activities_clause(&self, column: &str, current: Option<&str>) -> Option<String> {
        let parts: Option<Vec<String>> =
            self.activities.iter().map(|a| a.sql(column, current)).collect();
        parts.map(any_of)
    }

    pub fn types_clause(&self, column: &str) -> String {
        any_of(self.types.iter().map(|t| t.sql(column)).collect())
    }

    pub fn urls_clause(&self, column: &str) -> String {
        any_of(self.urls.iter().map(|u| glob_sql(u, column)).collect())
    }

    pub fn titles_clause(&self, column: &str) -> String {
        any_of(self.titles.iter().map(|t| glob_sql(t, column)).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Live matching
    // ─────────────────────────────────────────────────────────────────────────

    pub fn agent_matches(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a.matches(agent))
    }

    pub fn activity_matches(&self, activity: &str, current: Option<&str>) -> bool {
        self.activities.iter().any(|a| a.matches(activity, current))
    }

    pub fn url_matches(&self, resource: &str) -> bool {
        self.urls.iter().any(|u| u.matches(resource))
    }

    pub fn type_matches(&self, mimetype: Option<&str>) -> bool {
        self.types.iter().any(|t| t.matches(mimetype))
    }

    pub fn title_matches(&self, title: &str) -> bool {
        self.titles.iter().any(|t| t.matches(title))
    }

    /// Whether type matching can be decided without looking up the mimetype.
    pub fn accepts_any_type(&self) -> bool {
        self.types.iter().any(|t| matches!(t, TypeFilter::Any))
    }

    pub fn accepts_any_title(&self) -> bool {
        self.titles.iter().any(GlobPattern::is_any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::terms::{Activity, Agent, Select, Type, Url};

    #[test]
    fn test_agent_current_resolves_to_application() {
        let filters = Filters::new(&Query::default(), "org.example.app");
        assert_eq!(filters.agents_clause("agent"), "agent = 'org.example.app'");
        assert!(filters.agent_matches("org.example.app"));
        assert!(!filters.agent_matches("gvim"));
    }

    #[test]
    fn test_any_short_circuits_clause() {
        let query = Select::UsedResources | Agent::from(["gvim", ":any"]);
        let filters = Filters::new(&query, "app");
        assert_eq!(filters.agents_clause("agent"), "1");
    }

    #[test]
    fn test_multiple_tokens_are_or_combined() {
        let query = Select::UsedResources | Agent::from(["gvim", "kate"]);
        let filters = Filters::new(&query, "app");
        assert_eq!(filters.agents_clause("a"), "(a = 'gvim') OR (a = 'kate')");
    }

    #[test]
    fn test_current_activity_needs_context() {
        let filters = Filters::new(&Query::default(), "app");
        assert_eq!(filters.activities_clause("act", None), None);
        assert_eq!(filters.activities_clause("act", Some("a1")).as_deref(), Some("act = 'a1'"));
        assert!(filters.activity_matches("a1", Some("a1")));
        assert!(!filters.activity_matches("a1", None));
    }

    #[test]
    fn test_global_activity_is_literal() {
        let query = Query::default() | Activity::global();
        let filters = Filters::new(&query, "app");
        assert!(filters.activity_matches(":global", None));
        assert!(!filters.activity_matches("a1", Some("a1")));
    }

    #[test]
    fn test_type_categories() {
        let files = Filters::new(&(Query::default() | Type::files()), "app");
        assert!(files.type_matches(Some("text/plain")));
        assert!(!files.type_matches(Some("inode/directory")));
        assert!(!files.type_matches(None));

        let dirs = Filters::new(&(Query::default() | Type::directories()), "app");
        assert_eq!(dirs.types_clause("m"), "m = 'inode/directory'");

        let text = Filters::new(&(Query::default() | Type::from("text/*")), "app");
        assert_eq!(text.types_clause("m"), "m GLOB 'text/*'");
        assert!(text.type_matches(Some("text/x-rust")));
    }

    #[test]
    fn test_quotes_are_escaped() {
        let query = Query::default() | Agent::from("o'neil");
        let filters = Filters::new(&query, "app");
        assert_eq!(filters.agents_clause("a"), "a = 'o''neil'");
    }

    #[test]
    fn test_url_clause() {
        let query = Query::default() | Url::starts_with("/home/");
        let filters = Filters::new(&query, "app");
        assert_eq!(filters.urls_clause("r"), "r GLOB '/home/*'");
        assert_eq!(Filters::new(&Query::default(), "app").urls_clause("r"), "1");
    }
}
