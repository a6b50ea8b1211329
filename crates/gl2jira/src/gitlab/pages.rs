//! Lazy streams over GitLab's page-numbered list endpoints

use crate::error::Error;
use futures::stream::{self, Stream, TryStreamExt};
use gl2jira_core::pagination::PageCursor;
use serde::de::DeserializeOwned;

/// Stream every record of a list endpoint.
///
/// Pages are requested one at a time, and only when the consumer has drained
/// the previous one. The stream ends after the first short or empty page and
/// cannot be restarted.
pub fn paginate<'a, T>(
    http: &'a reqwest::Client,
    url: String,
    per_page: u32,
) -> impl Stream<Item = Result<T, Error>> + 'a
where
    T: DeserializeOwned + 'static,
{
    stream::try_unfold(Some(PageCursor::first(per_page)), move |cursor| {
        let url = url.clone();
        async move {
            let Some(cursor) = cursor else {
                return Ok::<_, Error>(None);
            };
            let records: Vec<T> = fetch_page(http, &url, &cursor).await?;
            let next = cursor.advance(records.len());
            Ok::<_, Error>(Some((records, next)))
        }
    })
    .map_ok(|records| stream::iter(records.into_iter().map(Ok::<T, Error>)))
    .try_flatten()
}

/// Fetch a single page of a list endpoint
pub async fn fetch_page<T>(
    http: &reqwest::Client,
    url: &str,
    cursor: &PageCursor,
) -> Result<Vec<T>, Error>
where
    T: DeserializeOwned,
{
    log::debug!("GET {url} (page {}, per_page {})", cursor.page, cursor.per_page);

    let response = http.get(url).query(&cursor.query()).send().await?;
    let response = check_status(url, response).await?;

    response.json::<Vec<T>>().await.map_err(|e| Error::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Turn a non-success response into [`Error::Api`]
pub async fn check_status(
    url: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status,
        url: url.to_string(),
        body,
    })
}
