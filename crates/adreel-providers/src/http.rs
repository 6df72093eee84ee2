//! HTTP plumbing shared by the provider adapters.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

pub(crate) fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ProviderError::Network)
}

/// Pass through 2xx responses; classify everything else.
pub(crate) async fn ensure_success(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_http_status(status.as_u16(), &body))
}

/// Stream a finished clip to disk. Returns bytes written.
pub(crate) async fn download_clip(client: &Client, url: &str, path: &Path) -> ProviderResult<u64> {
    debug!(url = url, path = %path.display(), "Downloading clip");

    let response = ensure_success(client.get(url).send().await?).await?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        let _ = tokio::fs::remove_file(path).await;
        return Err(ProviderError::InvalidResponse(format!(
            "empty clip download from {}",
            url
        )));
    }

    Ok(written)
}

/// Outcome of one status poll.
pub(crate) enum PollState<T> {
    Pending(String),
    Ready(T),
}

/// Poll `check` every `interval` until it is ready or fails.
///
/// There is no attempt cap; callers bound the whole call with a timeout.
pub(crate) async fn poll_until<T, F, Fut>(interval: Duration, mut check: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ProviderResult<PollState<T>>>,
{
    let mut polls = 0u32;
    loop {
        polls += 1;
        match check().await? {
            PollState::Ready(value) => return Ok(value),
            PollState::Pending(state) => {
                debug!(state = %state, polls = polls, "Generation pending");
                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// `base_url` + `path` without a doubled slash.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
