//! JIRA JSON importer records
//!
//! These mirror the document accepted by JIRA's "JSON" external system
//! import: a list of projects with nested issues and comments, and a list of
//! users referenced by those issues.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gitlab;
use crate::markup::MarkupConverter;

/// Group every imported user is placed in
pub const DEFAULT_USER_GROUP: &str = "gitlab-users";

pub const STATUS_OPEN: &str = "Open";
pub const STATUS_CLOSED: &str = "Closed";
pub const RESOLUTION_RESOLVED: &str = "Resolved";

/// Top-level import document
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ImportDocument {
    pub projects: Vec<Project>,
    pub users: Vec<User>,
}

/// JIRA project with its issues
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub key: String,
    pub description: String,
    pub issues: Vec<Issue>,
}

/// External identifier of an imported issue
///
/// Plain issue numbers collide when several GitLab projects are merged into
/// one JIRA project, so they can be prefixed with the project namespace.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExternalId {
    Number(u64),
    Namespaced(String),
}

impl ExternalId {
    pub fn new(iid: u64, namespace: Option<&str>) -> Self {
        match namespace {
            Some(ns) => ExternalId::Namespaced(format!("{ns}#{iid}")),
            None => ExternalId::Number(iid),
        }
    }
}

/// JIRA issue
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub external_id: ExternalId,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resolution: Option<String>,
    pub description: String,
    pub reporter: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub summary: String,
    pub issue_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub components: Option<Vec<String>>,
    pub comments: Vec<Comment>,
}

/// Comment on a JIRA issue
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comment {
    pub body: String,
    pub author: String,
    pub created: String,
}

/// JIRA user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub name: String,
    pub fullname: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    pub groups: Vec<String>,
    pub active: bool,
}

/// Per-run settings that shape every transformed issue
#[derive(Debug, Clone, PartialEq)]
pub struct IssueSettings {
    /// JIRA issue type assigned to every issue (e.g. "Bug")
    pub issue_type: String,
    /// GitLab state -> JIRA status overrides
    pub status_map: BTreeMap<String, String>,
    /// Prefix external IDs with the project's namespace path
    pub namespace_ids: bool,
    /// Add the lowercased project name as a JIRA component
    pub projects_to_components: bool,
}

impl Default for IssueSettings {
    fn default() -> Self {
        Self {
            issue_type: "Bug".to_string(),
            status_map: BTreeMap::new(),
            namespace_ids: false,
            projects_to_components: false,
        }
    }
}

/// Map a GitLab issue state to a JIRA status and optional resolution.
///
/// `closed` becomes `Closed`, anything else `Open`, unless the status map
/// overrides the state. A resolution is only reported for `Closed` issues.
pub fn resolve_status(
    state: &str,
    status_map: &BTreeMap<String, String>,
) -> (String, Option<String>) {
    let status = match status_map.get(state) {
        Some(mapped) => mapped.clone(),
        None if state == "closed" => STATUS_CLOSED.to_string(),
        None => STATUS_OPEN.to_string(),
    };

    let resolution = (status == STATUS_CLOSED).then(|| RESOLUTION_RESOLVED.to_string());

    (status, resolution)
}

/// Transform a GitLab note into a JIRA comment
pub fn transform_note(note: &gitlab::Note, converter: &MarkupConverter) -> Comment {
    Comment {
        body: converter.convert(note.body.as_deref()),
        author: note.author.username.clone(),
        created: note.created_at.clone(),
    }
}

/// Transform a GitLab issue and its notes into a JIRA issue
pub fn transform_issue(
    project: &gitlab::Project,
    issue: &gitlab::Issue,
    notes: &[gitlab::Note],
    settings: &IssueSettings,
    converter: &MarkupConverter,
) -> Issue {
    let namespace = settings
        .namespace_ids
        .then_some(project.path_with_namespace.as_str());
    let (status, resolution) = resolve_status(&issue.state, &settings.status_map);

    Issue {
        external_id: ExternalId::new(issue.iid, namespace),
        status,
        resolution,
        description: converter.convert(issue.description.as_deref()),
        reporter: issue.author.username.clone(),
        assignee: issue.assignee.as_ref().map(|a| a.username.clone()),
        labels: issue.labels.clone(),
        summary: issue.title.clone(),
        issue_type: settings.issue_type.clone(),
        components: settings
            .projects_to_components
            .then(|| vec![project.name.to_lowercase()]),
        comments: notes
            .iter()
            .map(|note| transform_note(note, converter))
            .collect(),
    }
}

/// Transform a GitLab user into a JIRA user
pub fn transform_user(user: &gitlab::User) -> User {
    User {
        name: user.username.clone(),
        fullname: user.name.clone(),
        email: user.email.clone(),
        groups: vec![DEFAULT_USER_GROUP.to_string()],
        active: user.state == "active",
    }
}
