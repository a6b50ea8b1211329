//! GitLab v4 REST payloads consumed by the exporter
//!
//! Only the fields the export reads are modelled; everything else in the
//! API response is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// GitLab project, as returned by `GET /projects`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub name_with_namespace: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub issues_enabled: bool,
    #[serde(default)]
    pub web_url: String,
}

/// Minimal user reference embedded in issues and notes
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub username: String,
}

/// GitLab issue, as returned by `GET /projects/:id/issues`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Issue {
    pub id: u64,
    /// Project-scoped issue number
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    pub author: UserRef,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub updated_at: String,
}

/// Comment on an issue, as returned by `GET /projects/:id/issues/:iid/notes`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Note {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub author: UserRef,
    pub created_at: String,
    /// Notes generated by GitLab itself (label changes, mentions, ...)
    #[serde(default)]
    pub system: bool,
}

/// GitLab user, as returned by `GET /users`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: String,
    /// Only visible to administrators
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub state: String,
}

fn default_true() -> bool {
    true
}
