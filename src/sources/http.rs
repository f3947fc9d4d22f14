use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{FetchCause, FetchError, SourceKey};

/// Thin wrapper over a shared `reqwest::Client` that classifies failures.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("StatusDashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// One GET, no retries. Timeouts surface as `FetchCause::Timeout`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        upstream: SourceKey,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let fail = |cause| FetchError::new(upstream, cause);

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| fail(classify(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fail(FetchCause::HttpStatus {
                status: status.as_u16(),
                body,
            }));
        }

        let text = response.text().await.map_err(|e| fail(classify(e)))?;
        serde_json::from_str(&text).map_err(|e| fail(FetchCause::Parse(e)))
    }
}

fn classify(error: reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Timeout
    } else {
        FetchCause::Network(error)
    }
}
