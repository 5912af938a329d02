//! Single-shot page fetching with content-type classification.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use docharvest_shared::{HarvestError, Result};

/// Overall per-request timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A fetched response body, classified by content type.
#[derive(Debug, Clone)]
pub enum FetchedBody {
    /// An HTML page, decoded to text.
    Html(String),
    /// Anything else: raw bytes plus the reported content type.
    Other {
        bytes: Vec<u8>,
        content_type: String,
    },
}

/// Thin wrapper over the HTTP client: one GET per call, overall timeout,
/// identifying User-Agent. Non-2xx statuses are errors, which the traversal
/// loop records and skips past.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| HarvestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Perform a single GET and classify the response.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedBody> {
        debug!(%url, "fetching");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| HarvestError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Network(format!("HTTP {status} for {url}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if content_type.contains("text/html") {
            let body = response
                .text()
                .await
                .map_err(|e| HarvestError::Network(format!("{url}: body read failed: {e}")))?;
            Ok(FetchedBody::Html(body))
        } else {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| HarvestError::Network(format!("{url}: body read failed: {e}")))?;
            Ok(FetchedBody::Other {
                bytes: bytes.to_vec(),
                content_type,
            })
        }
    }
}
