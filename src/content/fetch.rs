use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use super::BlobWriter;
use crate::error::{Error, Result};

const CONNECT_TIMEOUT_SECS: u64 = 10;

const MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = concat!("filekeep/", env!("CARGO_PKG_VERSION"));

/// What an upstream fetch reported, besides the bytes themselves.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub content_type: Option<String>,
}

/// Retrieves remote content into a blob writer with a size ceiling.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .read_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Streams `url` into `writer`, failing once more than `limit` bytes
    /// are advertised or received. The caller owns cleanup of `writer`.
    pub async fn fetch_into(
        &self,
        url: &str,
        limit: Option<u64>,
        writer: &mut BlobWriter,
    ) -> Result<FetchedContent> {
        validate_url(url)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::UpstreamFetch(format!("failed to fetch url: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamFetch(format!(
                "non-ok response: {}",
                status.as_u16()
            )));
        }

        if let (Some(limit), Some(length)) = (limit, response.content_length()) {
            if length > limit {
                return Err(Error::UpstreamFetch(format!(
                    "content too large: {length} bytes (max {limit} bytes)"
                )));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let mut received: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::UpstreamFetch(format!("failed to read response: {e}")))?
        {
            received += chunk.len() as u64;
            if let Some(limit) = limit {
                if received > limit {
                    return Err(Error::UpstreamFetch(format!(
                        "content too large: more than {limit} bytes"
                    )));
                }
            }
            writer.write(&chunk).await?;
        }

        Ok(FetchedContent { content_type })
    }
}

/// Only absolute http and https URLs are fetched.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|e| Error::validation(format!("invalid url: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(Error::validation(format!(
                "unsupported url scheme: {scheme}"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(Error::validation("url has no host"));
    }

    Ok(())
}
