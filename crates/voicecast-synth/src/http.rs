//! Shared reqwest transport.
//!
//! Every request is raced against the caller's [`CancellationToken`]; the
//! token wins ties so a request is never started once cancellation is
//! observed. Non-success statuses become [`SynthError::Status`] carrying the
//! start of the response body.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::{SynthError, SynthResult, truncate_body};

/// Thin wrapper over a configured [`reqwest::Client`].
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub(crate) fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("voicecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to create HTTP client");

        Self { client }
    }

    /// Start a POST request.
    pub(crate) fn post(&self, url: &Url) -> reqwest::RequestBuilder {
        self.client.post(url.clone())
    }

    /// Send the request and return the full response body.
    pub(crate) async fn fetch_bytes(
        &self,
        request: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> SynthResult<Bytes> {
        cancellable(cancel, async {
            let response = request.send().await?;
            let response = check_status(response).await?;
            Ok(response.bytes().await?)
        })
        .await
    }

    /// Send the request and deserialize a JSON body.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> SynthResult<T> {
        let body = self.fetch_bytes(request, cancel).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Run `fut` unless (or until) `cancel` fires.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = SynthResult<T>>,
) -> SynthResult<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(SynthError::Cancelled),
        result = fut => result,
    }
}

async fn check_status(response: reqwest::Response) -> SynthResult<reqwest::Response> {
    let status = response.status();
    debug!(url = %response.url(), status = status.as_u16(), "synthesis service responded");

    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(SynthError::Status {
        status: status.as_u16(),
        url,
        body: truncate_body(&body),
    })
}
