//! Star-glob patterns shared by the SQL compiler and the live matcher.
//!
//! `*` is the only wildcard. Everything else matches literally, both when
//! the pattern is evaluated in process and when it is rendered as an SQLite
//! `GLOB` operand, so the two sides agree on every input.

use regex::Regex;

use crate::query::special::{ANY_PATTERN, ANY_TYPE_TAG};

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Literal,
    Regex(Regex),
}

/// A compiled `*` glob.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    matcher: Matcher,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        let matcher = if pattern == ANY_PATTERN || pattern == ANY_TYPE_TAG {
            Matcher::Any
        } else if !has_wildcard(pattern) {
            Matcher::Literal
        } else {
            let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
            match Regex::new(&format!("(?s)^{}$", body.join(".*"))) {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    tracing::warn!("Cannot compile pattern {:?}: {}", pattern, e);
                    Matcher::Literal
                }
            }
        };

        Self { raw: pattern.to_string(), matcher }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the pattern accepts every value.
    pub fn is_any(&self) -> bool {
        matches!(self.matcher, Matcher::Any)
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Literal => self.raw == value,
            Matcher::Regex(re) => re.is_match(value),
        }
    }

    /// The pattern as an SQLite `GLOB` operand (unquoted).
    pub fn to_sql_glob(&self) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for c in self.raw.chars() {
            match c {
                '?' => out.push_str("[?]"),
                '[' => out.push_str("[[]"),
                other => out.push(other),
            }
        }
        out
    }
}

pub fn has_wildcard(value: &str) -> bool {
    value.contains('*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("applications:*", "applications:org.foo.bar", true)]
    #[case("applications:*", "app:other", false)]
    #[case("*", "", true)]
    #[case("*", "anything at all", true)]
    #[case(":any", "whatever", true)]
    #[case("/path/high*", "/path/high1_act1_gvim", true)]
    #[case("/path/high*", "/other/path/high1", false)]
    #[case("*act1*", "/path/mid6_act1_glob", true)]
    #[case("a.c", "abc", false)]
    #[case("a.c", "a.c", true)]
    #[case("(x)*", "(x)yz", true)]
    #[case("text/*", "text/plain", true)]
    #[case("text/*", "image/png", false)]
    fn test_glob_matching(#[case] pattern: &str, #[case] value: &str, #[case] expected: bool) {
        assert_eq!(GlobPattern::new(pattern).matches(value), expected);
    }

    #[test]
    fn test_any_fast_path() {
        assert!(GlobPattern::new("*").is_any());
        assert!(!GlobPattern::new("a*").is_any());
    }

    #[test]
    fn test_sql_glob_escaping() {
        assert_eq!(GlobPattern::new("/tmp/a?b[c]*").to_sql_glob(), "/tmp/a[?]b[[]c]*");
    }
}
