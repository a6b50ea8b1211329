use crate::gitlab::{Credentials, GitLabClient, GitLabConfig};
use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use futures::TryStreamExt;
use gl2jira_core::export::{ExportSettings, Exporter, IssueWithNotes};
use gl2jira_core::filter::{parse_mapping, parse_name_list, DateFilter, FilterError, ProjectFilter};
use gl2jira_core::gitlab::Project;
use gl2jira_core::jira::{ImportDocument, IssueSettings};
use gl2jira_core::key::ProjectKeys;
use gl2jira_core::pagination::DEFAULT_PAGE_SIZE;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for the export
#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Export everything using a personal access token:
  gl2jira https://gitlab.example.com -t glpat-xxxx > jira.json

  # Only issues touched since the start of 2024, for two projects:
  gl2jira https://gitlab.example.com -d 2024-01-01 -I web-app api

  # Merge every project into a single JIRA project, namespacing the IDs:
  gl2jira https://gitlab.example.com -D CORE -n

  # Remap GitLab states to JIRA workflow statuses:
  gl2jira https://gitlab.example.com -S closed=Done opened=\"To Do\"

NOTES:
  - Without a token you are prompted for a username and password
  - Project names in include/ignore lists are matched case-insensitively
  - Only users referenced by exported issues and comments are included")]
pub struct ExportOptions {
    /// The full URL to your GitLab instance
    #[clap(env = "GITLAB_URL")]
    pub gitlab_url: String,

    /// Create JIRA components from GitLab project names
    #[arg(short = 'c', long)]
    pub projects_to_components: bool,

    /// Only include issues updated or commented on after this date (YYYY-MM-DD)
    #[arg(
        short = 'd',
        long,
        default_value = DateFilter::DEFAULT_CUTOFF,
        value_parser = parse_date_filter
    )]
    pub date_filter: DateFilter,

    /// Default JIRA project key that every project's issues are imported into
    #[arg(short = 'D', long = "default-jira-project")]
    pub default_jira_project: Option<String>,

    /// Include projects that do not have any issues
    #[arg(short = 'e', long)]
    pub include_empty: bool,

    /// File of project names to exclude, one per line
    #[arg(short = 'i', long, value_name = "FILE")]
    pub ignore_list: Option<PathBuf>,

    /// Project names to include (space separated)
    #[arg(short = 'I', long, num_args = 1.., value_name = "NAME")]
    pub include_list: Option<Vec<String>>,

    /// Do not convert GitLab Markdown to JIRA Wiki markup
    #[arg(short = 'm', long)]
    pub preserve_markdown: bool,

    /// Map GitLab project names to JIRA project keys (old=new, space separated)
    #[arg(short = 'M', long, num_args = 1.., value_name = "OLD=NEW")]
    pub project_map: Vec<String>,

    /// Prefix external IDs with the GitLab namespace. Needed when importing
    /// several GitLab projects into one JIRA project.
    #[arg(short = 'n', long = "add-namespace-to-id")]
    pub add_namespace_to_id: bool,

    /// Password used when no token is given (prompted for if missing)
    #[arg(short = 'p', long, env = "GITLAB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// How many results to request per page (1-100)
    #[arg(short = 'P', long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Enable SSL certificate verification
    #[arg(short = 's', long)]
    pub verify_ssl: bool,

    /// Map GitLab issue states to JIRA statuses (old=new, space separated)
    #[arg(short = 'S', long, num_args = 1.., value_name = "OLD=NEW")]
    pub status_map: Vec<String>,

    /// Private GitLab API token. Either this or username and password must be set.
    #[arg(short = 't', long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Default JIRA issue type
    #[arg(short = 'T', long, default_value = "Bug")]
    pub issue_type: String,

    /// Username used when no token is given (prompted for if missing)
    #[arg(short = 'u', long, env = "GITLAB_USERNAME")]
    pub username: Option<String>,

    /// Keep relative /uploads/ links instead of pointing them at GitLab
    #[arg(long)]
    pub no_absolute_assets: bool,

    /// Leave out notes generated by GitLab (label changes, cross references, ...)
    #[arg(long)]
    pub skip_system_notes: bool,
}

fn parse_date_filter(value: &str) -> std::result::Result<DateFilter, FilterError> {
    DateFilter::parse(value)
}

impl ExportOptions {
    pub fn export_settings(&self) -> Result<ExportSettings> {
        Ok(ExportSettings {
            issues: IssueSettings {
                issue_type: self.issue_type.clone(),
                status_map: parse_mapping(&self.status_map).context("Invalid --status-map")?,
                namespace_ids: self.add_namespace_to_id,
                projects_to_components: self.projects_to_components,
            },
            preserve_markdown: self.preserve_markdown,
            absolute_assets: !self.no_absolute_assets,
        })
    }

    pub fn project_keys(&self) -> Result<ProjectKeys> {
        let map = parse_mapping(&self.project_map).context("Invalid --project-map")?;
        Ok(ProjectKeys::new(self.default_jira_project.clone(), map))
    }

    pub fn project_filter(&self) -> Result<ProjectFilter> {
        let ignore = match &self.ignore_list {
            Some(path) => read_ignore_list(path)?,
            None => HashSet::new(),
        };
        Ok(ProjectFilter::new(self.include_list.as_ref(), ignore))
    }

    /// Connection settings; prompts for a username/password if needed
    pub fn gitlab_config(&self) -> Result<GitLabConfig> {
        if !(self.gitlab_url.starts_with("http://") || self.gitlab_url.starts_with("https://")) {
            return Err(eyre!(
                "GitLab URL must start with http:// or https://, got '{}'",
                self.gitlab_url
            ));
        }

        let credentials = Credentials::resolve(
            self.token.clone(),
            self.username.clone(),
            self.password.clone(),
        )?;

        Ok(GitLabConfig {
            base_url: self.gitlab_url.clone(),
            credentials,
            verify_ssl: self.verify_ssl,
            per_page: self.page_size,
        })
    }
}

/// Read the ignore list file (one project name per line)
pub fn read_ignore_list(path: &Path) -> Result<HashSet<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ignore list {}", path.display()))?;
    Ok(parse_name_list(&contents))
}

/// Serialize the document as JSON with a four space indent
pub fn to_json(document: &ImportDocument) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    document
        .serialize(&mut serializer)
        .context("Failed to serialize the import document")?;
    String::from_utf8(buffer).context("Serialized document is not UTF-8")
}

fn create_spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Collect the issues of a project that pass the date filter, with their notes
async fn collect_issues(
    client: &GitLabClient,
    project: &Project,
    options: &ExportOptions,
) -> Result<Vec<IssueWithNotes>> {
    let mut collected = Vec::new();
    let mut issues = std::pin::pin!(client.issues(project.id));

    while let Some(issue) = issues.try_next().await? {
        let mut notes = client.notes(project.id, issue.iid).await?;
        if options.skip_system_notes {
            notes.retain(|note| !note.system);
        }

        if options.date_filter.issue_qualifies(&issue, &notes)? {
            collected.push((issue, notes));
        } else {
            log::debug!("{}#{} has no recent activity", project.path_with_namespace, issue.iid);
        }
    }

    Ok(collected)
}

async fn export_projects(
    client: &GitLabClient,
    options: &ExportOptions,
    filter: &ProjectFilter,
    exporter: &mut Exporter,
    spinner: &ProgressBar,
) -> Result<()> {
    let mut projects = std::pin::pin!(client.projects());

    while let Some(project) = projects.try_next().await? {
        spinner.set_message(format!("Scanning {}", project.name_with_namespace));

        if !filter.allows(&project) {
            log::debug!("Skipping project {}", project.name);
            continue;
        }

        let issues = collect_issues(client, &project, options).await?;
        if issues.is_empty() && !options.include_empty {
            log::info!("Skipping {}: no matching issues", project.name);
            continue;
        }

        let jira = exporter
            .add_project(&project, issues)
            .with_context(|| format!("Failed to assign a key to {}", project.name))?;
        log::info!(
            "Exported {} as {} ({} issues)",
            project.name,
            jira.key,
            jira.issues.len()
        );
    }

    Ok(())
}

async fn export_users(
    client: &GitLabClient,
    exporter: &mut Exporter,
    spinner: &ProgressBar,
) -> Result<()> {
    let wanted = exporter.mentioned_users().len();
    let mut found = 0;
    let mut users = std::pin::pin!(client.users());

    while let Some(user) = users.try_next().await? {
        spinner.set_message(format!("Creating user entries ({found}/{wanted})"));
        if exporter.add_user(&user) {
            found += 1;
            if found == wanted {
                break;
            }
        }
    }

    if found < wanted {
        log::warn!("{} referenced user(s) were not found in GitLab", wanted - found);
    }

    Ok(())
}

fn print_summary(document: &ImportDocument) -> Result<()> {
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Key".bold().cyan(),
        "Project".bold().cyan(),
        "Issues".bold().cyan(),
        "Comments".bold().cyan()
    ]);

    for project in &document.projects {
        let comments: usize = project.issues.iter().map(|i| i.comments.len()).sum();
        table.add_row(prettytable::row![
            project.key.bright_yellow(),
            project.name.bright_white(),
            project.issues.len(),
            comments
        ]);
    }

    eprintln!();
    table
        .print(&mut std::io::stderr())
        .context("Failed to print summary")?;
    eprintln!(
        "\n{} project(s), {} user(s) exported",
        document.projects.len().to_string().bold(),
        document.users.len().to_string().bold()
    );

    Ok(())
}

/// Run the export and print the import document to stdout
pub async fn run(options: ExportOptions, global: crate::Global) -> Result<()> {
    let settings = options.export_settings()?;
    let keys = options.project_keys()?;
    let filter = options.project_filter()?;
    let client = GitLabClient::connect(options.gitlab_config()?).await?;
    log::debug!("Requesting {} records per page", client.config().per_page);

    let spinner = create_spinner(global.quiet)?;
    let mut exporter = Exporter::new(settings, keys);

    spinner.set_message("Creating project entries...");
    export_projects(&client, &options, &filter, &mut exporter, &spinner).await?;

    spinner.set_message("Creating user entries...");
    export_users(&client, &mut exporter, &spinner).await?;

    spinner.finish_and_clear();

    let document = exporter.finish();
    println!("{}", to_json(&document)?);

    if !global.quiet {
        print_summary(&document)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::App;
    use clap::Parser;
    use std::io::Write;

    fn parse(args: &[&str]) -> App {
        App::try_parse_from(std::iter::once("gl2jira").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let app = parse(&["https://gitlab.example.com", "-t", "secret"]);
        let options = app.export;

        assert_eq!(options.gitlab_url, "https://gitlab.example.com");
        assert_eq!(options.page_size, 20);
        assert_eq!(options.issue_type, "Bug");
        assert_eq!(options.date_filter, DateFilter::default());
        assert!(!options.verify_ssl);
        assert!(options.include_list.is_none());

        let settings = options.export_settings().unwrap();
        assert!(!settings.preserve_markdown);
        assert!(settings.absolute_assets);
        assert!(settings.issues.status_map.is_empty());
    }

    #[test]
    fn test_short_flags() {
        let app = parse(&[
            "https://gitlab.example.com",
            "-c",
            "-m",
            "-n",
            "-e",
            "-s",
            "-T",
            "Task",
            "-P",
            "50",
            "-d",
            "2024-01-01",
            "-D",
            "CORE",
            "-vv",
        ]);
        let options = app.export;

        assert!(options.projects_to_components);
        assert!(options.preserve_markdown);
        assert!(options.add_namespace_to_id);
        assert!(options.include_empty);
        assert!(options.verify_ssl);
        assert_eq!(options.issue_type, "Task");
        assert_eq!(options.page_size, 50);
        assert_eq!(options.date_filter, DateFilter::parse("2024-01-01").unwrap());
        assert_eq!(options.default_jira_project.as_deref(), Some("CORE"));
        assert_eq!(app.global.verbose, 2);
    }

    #[test]
    fn test_multi_value_maps() {
        let app = parse(&[
            "https://gitlab.example.com",
            "-S",
            "closed=Done",
            "opened=To Do",
            "-M",
            "legacy=LEG",
        ]);

        let settings = app.export.export_settings().unwrap();
        let mut keys = app.export.project_keys().unwrap();

        assert_eq!(
            settings.issues.status_map.get("opened").map(String::as_str),
            Some("To Do")
        );
        assert_eq!(keys.key_for("legacy").unwrap(), "LEG");
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let result = App::try_parse_from(["gl2jira", "https://gitlab.example.com", "-d", "yesterday"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_mapping_is_reported() {
        let app = parse(&["https://gitlab.example.com", "-S", "closed"]);

        assert!(app.export.export_settings().is_err());
    }

    #[test]
    fn test_project_filter_from_files_and_args() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Legacy App\n\n  scratch  ").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let app = parse(&[
            "https://gitlab.example.com",
            "-i",
            &path,
            "-I",
            "web",
            "legacy app",
        ]);
        let filter = app.export.project_filter().unwrap();

        assert!(filter.allows_name("Web"));
        assert!(!filter.allows_name("Legacy App"));
        assert!(!filter.allows_name("scratch"));
    }

    #[test]
    fn test_gitlab_url_must_be_http() {
        let app = parse(&["gitlab.example.com", "-t", "secret"]);

        assert!(app.export.gitlab_config().is_err());
    }

    #[test]
    fn test_gitlab_config_with_token() {
        let app = parse(&["https://gitlab.example.com", "-t", "secret", "-P", "500"]);

        let config = app.export.gitlab_config().unwrap();

        assert_eq!(config.credentials, Credentials::Token("secret".to_string()));
        assert_eq!(config.per_page, 500);
        assert!(!config.verify_ssl);
    }

    #[test]
    fn test_missing_ignore_list_is_an_error() {
        let result = read_ignore_list(Path::new("/nonexistent/ignore.txt"));

        assert!(result.is_err());
    }

    #[test]
    fn test_to_json_uses_four_space_indent() {
        let json = to_json(&ImportDocument::default()).unwrap();

        assert_eq!(json, "{\n    \"projects\": [],\n    \"users\": []\n}");
    }
}
