pub mod auth;
pub mod pages;

use crate::error::Error;
use futures::stream::{Stream, TryStreamExt};
use gl2jira_core::gitlab::{Issue, Note, Project, User};
use gl2jira_core::pagination::clamp_page_size;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

pub use auth::Credentials;

/// REST API prefix appended to the instance URL
pub const API_PREFIX: &str = "/api/v4";

/// GitLab connection settings
#[derive(Debug, Clone)]
pub struct GitLabConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub verify_ssl: bool,
    pub per_page: u32,
}

impl GitLabConfig {
    /// Instance URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Full URL of a REST API path (e.g. `/projects`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url())
    }
}

/// Build a reqwest client honoring the SSL setting and extra default headers
pub fn build_http_client(
    verify_ssl: bool,
    headers: HeaderMap,
) -> std::result::Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .default_headers(headers)
        .danger_accept_invalid_certs(!verify_ssl)
        .user_agent(concat!("gl2jira/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::from)
}

/// Authenticated GitLab API client
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    config: GitLabConfig,
}

impl GitLabClient {
    /// Authenticate against the instance and build the client.
    ///
    /// Private tokens are sent as-is; username/password pairs are first
    /// exchanged for an OAuth access token.
    pub async fn connect(config: GitLabConfig) -> std::result::Result<Self, Error> {
        let (name, value) = match &config.credentials {
            Credentials::Token(token) => (HeaderName::from_static("private-token"), token.clone()),
            Credentials::Password { username, password } => {
                let token = auth::request_access_token(&config, username, password).await?;
                (AUTHORIZATION, format!("Bearer {token}"))
            }
        };

        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&value)
            .map_err(|e| Error::Auth(format!("invalid credentials header: {e}")))?;
        value.set_sensitive(true);
        headers.insert(name, value);

        let http = build_http_client(config.verify_ssl, headers)?;
        log::info!("Connected to {}", config.base_url());

        Ok(Self {
            http,
            config: GitLabConfig {
                per_page: clamp_page_size(config.per_page),
                ..config
            },
        })
    }

    pub fn config(&self) -> &GitLabConfig {
        &self.config
    }

    /// Every project visible to the authenticated user
    pub fn projects(&self) -> impl Stream<Item = std::result::Result<Project, Error>> + '_ {
        self.list(projects_path())
    }

    /// Every issue of a project, in all states
    pub fn issues(
        &self,
        project_id: u64,
    ) -> impl Stream<Item = std::result::Result<Issue, Error>> + '_ {
        self.list(issues_path(project_id))
    }

    /// All notes of one issue
    pub async fn notes(
        &self,
        project_id: u64,
        issue_iid: u64,
    ) -> std::result::Result<Vec<Note>, Error> {
        self.list(notes_path(project_id, issue_iid))
            .try_collect()
            .await
    }

    /// Every user account of the instance
    pub fn users(&self) -> impl Stream<Item = std::result::Result<User, Error>> + '_ {
        self.list(users_path())
    }

    fn list<T>(&self, path: String) -> impl Stream<Item = std::result::Result<T, Error>> + '_
    where
        T: serde::de::DeserializeOwned + 'static,
    {
        pages::paginate(&self.http, self.config.api_url(&path), self.config.per_page)
    }
}

fn projects_path() -> String {
    "/projects".to_string()
}

fn issues_path(project_id: u64) -> String {
    format!("/projects/{project_id}/issues")
}

fn notes_path(project_id: u64, issue_iid: u64) -> String {
    format!("/projects/{project_id}/issues/{issue_iid}/notes")
}

fn users_path() -> String {
    "/users".to_string()
}
