//! Row types read back from the resources database.

/// Title and mimetype recorded for a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    pub title: Option<String>,
    pub mimetype: Option<String>,
}

/// One row of the score cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub activity: String,
    pub agent: String,
    pub resource: String,
    pub score: f64,
    pub first_update: i64,
    pub last_update: i64,
}
