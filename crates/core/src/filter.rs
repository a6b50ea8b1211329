//! Filters deciding which GitLab records are exported
//!
//! Covers the project include/ignore lists, the "changed since" date cutoff
//! and parsing of `key=value` mapping arguments.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};

use crate::gitlab;

/// Error type for filter parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid mapping '{0}': expected the form old=new")]
    InvalidMapping(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Parse `old=new` arguments into a map.
///
/// The entry is split at the first `=`, so values may themselves contain `=`.
pub fn parse_mapping<S: AsRef<str>>(entries: &[S]) -> Result<BTreeMap<String, String>, FilterError> {
    let mut map = BTreeMap::new();

    for entry in entries {
        let entry = entry.as_ref();
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| FilterError::InvalidMapping(entry.to_string()))?;
        if key.is_empty() {
            return Err(FilterError::InvalidMapping(entry.to_string()));
        }
        map.insert(key.to_string(), value.to_string());
    }

    Ok(map)
}

/// Parse a newline-separated list of project names.
///
/// Names are trimmed and lowercased; blank lines are skipped.
pub fn parse_name_list(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Selects projects by name, case-insensitively
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    include: Option<HashSet<String>>,
    ignore: HashSet<String>,
}

impl ProjectFilter {
    pub fn new<I, S>(include: Option<I>, ignore: HashSet<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include: include.map(|names| {
                names
                    .into_iter()
                    .map(|name| name.as_ref().to_lowercase())
                    .collect()
            }),
            ignore: ignore.into_iter().map(|name| name.to_lowercase()).collect(),
        }
    }

    /// Whether the project name passes the include and ignore lists
    pub fn allows_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();

        if let Some(include) = &self.include {
            if !include.contains(&name) {
                return false;
            }
        }

        !self.ignore.contains(&name)
    }

    /// Whether the project should be exported at all
    pub fn allows(&self, project: &gitlab::Project) -> bool {
        project.issues_enabled && self.allows_name(&project.name)
    }
}

/// Only export issues with activity after a cutoff date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
    cutoff: NaiveDateTime,
}

impl Default for DateFilter {
    fn default() -> Self {
        Self {
            cutoff: NaiveDateTime::default(),
        }
    }
}

impl DateFilter {
    pub const DEFAULT_CUTOFF: &'static str = "1970-01-01";

    pub fn new(cutoff: NaiveDateTime) -> Self {
        Self { cutoff }
    }

    /// Build a filter from a `YYYY-MM-DD` date; the cutoff is midnight.
    pub fn parse(date: &str) -> Result<Self, FilterError> {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| FilterError::InvalidDate(date.to_string()))?;
        Ok(Self::new(day.and_hms_opt(0, 0, 0).unwrap_or_default()))
    }

    pub fn cutoff(&self) -> NaiveDateTime {
        self.cutoff
    }

    /// Whether an RFC 3339 timestamp is strictly after the cutoff.
    ///
    /// The timestamp's own wall-clock time is compared; its offset is dropped.
    pub fn is_after(&self, timestamp: &str) -> Result<bool, FilterError> {
        let parsed = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| FilterError::InvalidTimestamp(timestamp.to_string()))?;
        Ok(parsed.naive_local() > self.cutoff)
    }

    /// Whether the issue was updated, or commented on, after the cutoff
    pub fn issue_qualifies(
        &self,
        issue: &gitlab::Issue,
        notes: &[gitlab::Note],
    ) -> Result<bool, FilterError> {
        if self.is_after(&issue.updated_at)? {
            return Ok(true);
        }

        for note in notes {
            if self.is_after(&note.created_at)? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_project(name: &str, issues_enabled: bool) -> gitlab::Project {
        gitlab::Project {
            id: 1,
            name: name.to_string(),
            name_with_namespace: String::new(),
            path_with_namespace: String::new(),
            description: None,
            issues_enabled,
            web_url: String::new(),
        }
    }

    fn create_issue(updated_at: &str) -> gitlab::Issue {
        gitlab::Issue {
            id: 1,
            iid: 1,
            title: "t".to_string(),
            description: None,
            state: "opened".to_string(),
            author: gitlab::UserRef {
                username: "alice".to_string(),
            },
            assignee: None,
            labels: vec![],
            created_at: None,
            updated_at: updated_at.to_string(),
        }
    }

    fn create_note(created_at: &str) -> gitlab::Note {
        gitlab::Note {
            id: 1,
            body: None,
            author: gitlab::UserRef {
                username: "bob".to_string(),
            },
            created_at: created_at.to_string(),
            system: false,
        }
    }

    #[test]
    fn test_parse_mapping() {
        let map = parse_mapping(&["closed=Done", "opened=To Do", "a=b=c"]).unwrap();

        assert_eq!(map.get("closed").map(String::as_str), Some("Done"));
        assert_eq!(map.get("opened").map(String::as_str), Some("To Do"));
        assert_eq!(map.get("a").map(String::as_str), Some("b=c"));
    }

    #[test]
    fn test_parse_mapping_rejects_malformed_entries() {
        assert_eq!(
            parse_mapping(&["nodelimiter"]),
            Err(FilterError::InvalidMapping("nodelimiter".to_string()))
        );
        assert!(parse_mapping(&["=value"]).is_err());
    }

    #[test]
    fn test_parse_name_list() {
        let names = parse_name_list("  Web App \n\nTOOLS\r\n");

        assert_eq!(names.len(), 2);
        assert!(names.contains("web app"));
        assert!(names.contains("tools"));
    }

    #[test]
    fn test_project_filter_include_and_ignore() {
        let ignore = parse_name_list("legacy");
        let filter = ProjectFilter::new(Some(["Web", "Legacy"]), ignore);

        assert!(filter.allows_name("web"));
        assert!(filter.allows_name("WEB"));
        assert!(!filter.allows_name("legacy"));
        assert!(!filter.allows_name("other"));
    }

    #[test]
    fn test_project_filter_without_include_list() {
        let filter = ProjectFilter::new(None::<Vec<String>>, HashSet::new());

        assert!(filter.allows(&create_project("Anything", true)));
        assert!(!filter.allows(&create_project("Anything", false)));
    }

    #[test]
    fn test_date_filter_parse() {
        let filter = DateFilter::parse("2024-02-01").unwrap();

        assert_eq!(filter.cutoff().to_string(), "2024-02-01 00:00:00");
        assert_eq!(
            DateFilter::parse("02/01/2024"),
            Err(FilterError::InvalidDate("02/01/2024".to_string()))
        );
    }

    #[test]
    fn test_default_cutoff_matches_epoch() {
        assert_eq!(
            DateFilter::default(),
            DateFilter::parse(DateFilter::DEFAULT_CUTOFF).unwrap()
        );
    }

    #[test]
    fn test_is_after_uses_wall_clock_time() {
        let filter = DateFilter::parse("2024-02-01").unwrap();

        assert!(filter.is_after("2024-02-01T00:00:01Z").unwrap());
        assert!(!filter.is_after("2024-02-01T00:00:00Z").unwrap());
        assert!(!filter.is_after("2024-01-31T23:00:00.000-05:00").unwrap());
        assert!(filter.is_after("not a date").is_err());
    }

    #[test]
    fn test_issue_qualifies_by_update_or_note() {
        let filter = DateFilter::parse("2024-02-01").unwrap();
        let recent = create_issue("2024-03-01T00:00:00Z");
        let stale = create_issue("2024-01-01T00:00:00Z");

        assert!(filter.issue_qualifies(&recent, &[]).unwrap());
        assert!(!filter.issue_qualifies(&stale, &[]).unwrap());
        assert!(filter
            .issue_qualifies(&stale, &[create_note("2024-02-15T12:00:00Z")])
            .unwrap());
        assert!(!filter
            .issue_qualifies(&stale, &[create_note("2023-12-15T12:00:00Z")])
            .unwrap());
    }
}
