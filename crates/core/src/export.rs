//! Assembles one export run into a JIRA import document
//!
//! The shell feeds projects (with their filtered issues and notes) and then
//! users into an [`Exporter`]. The exporter owns all per-run state: issued
//! project keys and the usernames referenced so far.

use std::collections::BTreeSet;

use crate::gitlab;
use crate::jira::{self, ImportDocument, IssueSettings};
use crate::key::{KeyError, ProjectKeys};
use crate::markup::{MarkupConverter, MarkupOptions};

/// Settings for an export run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSettings {
    pub issues: IssueSettings,
    /// Keep GitLab Markdown instead of converting to Wiki markup
    pub preserve_markdown: bool,
    /// Rewrite relative upload links against each project's web URL
    pub absolute_assets: bool,
}

/// A GitLab issue together with its notes
pub type IssueWithNotes = (gitlab::Issue, Vec<gitlab::Note>);

/// Pure export pipeline state
#[derive(Debug)]
pub struct Exporter {
    settings: ExportSettings,
    keys: ProjectKeys,
    mentioned: BTreeSet<String>,
    document: ImportDocument,
}

impl Exporter {
    pub fn new(settings: ExportSettings, keys: ProjectKeys) -> Self {
        Self {
            settings,
            keys,
            mentioned: BTreeSet::new(),
            document: ImportDocument::default(),
        }
    }

    /// Converter for one project's text fields
    pub fn converter_for(&self, project: &gitlab::Project) -> MarkupConverter {
        let asset_root = (self.settings.absolute_assets && !project.web_url.is_empty())
            .then(|| project.web_url.trim_end_matches('/').to_string());

        MarkupConverter::new(MarkupOptions {
            preserve_markdown: self.settings.preserve_markdown,
            asset_root,
        })
    }

    /// Build the JIRA project for a GitLab project and its issues.
    pub fn add_project(
        &mut self,
        project: &gitlab::Project,
        issues: Vec<IssueWithNotes>,
    ) -> Result<&jira::Project, KeyError> {
        let key = self.keys.key_for(&project.name)?;
        let converter = self.converter_for(project);

        let mut jira_issues = Vec::with_capacity(issues.len());
        for (issue, notes) in &issues {
            let jira_issue =
                jira::transform_issue(project, issue, notes, &self.settings.issues, &converter);

            self.mentioned.insert(jira_issue.reporter.clone());
            if let Some(assignee) = &jira_issue.assignee {
                self.mentioned.insert(assignee.clone());
            }
            for comment in &jira_issue.comments {
                self.mentioned.insert(comment.author.clone());
            }

            jira_issues.push(jira_issue);
        }

        let name = if project.name_with_namespace.is_empty() {
            project.name.clone()
        } else {
            project.name_with_namespace.clone()
        };

        let index = self.document.projects.len();
        self.document.projects.push(jira::Project {
            name,
            key,
            description: converter.convert(project.description.as_deref()),
            issues: jira_issues,
        });

        Ok(&self.document.projects[index])
    }

    /// Add a user to the document if any exported record references them.
    ///
    /// Returns whether the user was added.
    pub fn add_user(&mut self, user: &gitlab::User) -> bool {
        if !self.mentioned.contains(&user.username) {
            return false;
        }
        self.document.users.push(jira::transform_user(user));
        true
    }

    /// Usernames referenced by exported issues and comments
    pub fn mentioned_users(&self) -> &BTreeSet<String> {
        &self.mentioned
    }

    pub fn projects(&self) -> &[jira::Project] {
        &self.document.projects
    }

    pub fn finish(self) -> ImportDocument {
        self.document
    }
}
