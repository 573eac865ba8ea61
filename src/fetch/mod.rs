mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::debug;

use crate::error::LoadError;

fn fetch_failure(source: &str, reason: impl ToString) -> LoadError {
    LoadError::FetchFailure {
        source_name: source.to_string(),
        reason: reason.to_string(),
    }
}

/// GETs `url` and returns the body. Non-2xx responses are fetch failures.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, LoadError> {
    let parsed: reqwest::Url = url.parse().map_err(|e| fetch_failure(url, e))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| fetch_failure(url, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(fetch_failure(url, format!("HTTP status {status}")));
    }

    let bytes = resp.bytes().await.map_err(|e| fetch_failure(url, e))?;
    debug!(url, bytes = bytes.len(), "Fetched");
    Ok(bytes.to_vec())
}

/// Loads `source` over HTTP when it looks like a URL, otherwise from disk.
pub async fn fetch_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(client, source).await
    } else {
        tokio::fs::read(source)
            .await
            .map_err(|e| fetch_failure(source, e))
    }
}
