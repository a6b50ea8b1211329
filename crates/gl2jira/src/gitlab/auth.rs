//! GitLab credentials and the password login flow

use super::{build_http_client, pages::check_status, GitLabConfig};
use crate::error::Error;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// How to authenticate against GitLab
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal or impersonation access token
    Token(String),
    /// Account login, exchanged for an OAuth access token
    Password { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Pick credentials from the CLI/environment, prompting for whatever is
    /// missing when no token was given.
    pub fn resolve(
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> std::result::Result<Self, Error> {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            return Ok(Credentials::Token(token));
        }

        let username = match username.filter(|u| !u.is_empty()) {
            Some(username) => username,
            None => prompt_username()?,
        };
        let password = match password {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")
                .map_err(|e| Error::Auth(format!("failed to read password: {e}")))?,
        };

        Ok(Credentials::Password { username, password })
    }
}

fn prompt_username() -> std::result::Result<String, Error> {
    let mut stderr = std::io::stderr();
    write!(stderr, "Username: ")
        .and_then(|_| stderr.flush())
        .map_err(|e| Error::Auth(format!("failed to prompt for username: {e}")))?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Error::Auth(format!("failed to read username: {e}")))?;

    let username = line.trim().to_string();
    if username.is_empty() {
        return Err(Error::Auth("a username or a token is required".to_string()));
    }
    Ok(username)
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange a username and password for an OAuth access token
/// (`POST /oauth/token` with the password grant).
pub async fn request_access_token(
    config: &GitLabConfig,
    username: &str,
    password: &str,
) -> std::result::Result<String, Error> {
    let http = build_http_client(config.verify_ssl, HeaderMap::new())?;
    let url = format!("{}/oauth/token", config.base_url());

    log::debug!("Requesting access token for {username} at {url}");
    let response = http
        .post(&url)
        .json(&TokenRequest {
            grant_type: "password",
            username,
            password,
        })
        .send()
        .await?;

    let response = check_status(&url, response).await.map_err(|e| match e {
        Error::Api { status, .. } => Error::Auth(format!("login as {username} rejected ({status})")),
        other => other,
    })?;

    let token: TokenResponse = response.json().await.map_err(|e| Error::Decode {
        url: url.clone(),
        message: e.to_string(),
    })?;

    Ok(token.access_token)
}
