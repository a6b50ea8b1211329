#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("GitLab API error [{status}] for {url}: {body}")]
    Api {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Failed to decode GitLab response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
