use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use url::Url;

use crate::traits::PageFetcher;

/// Default timeout for competitor and target page fetches.
pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_BODY_BYTES: usize = 500_000;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; RankwatchBot/1.0)";

/// Plain HTTP GET page fetcher with a body size cap.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new(PAGE_FETCH_TIMEOUT)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid page URL: {url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("Unsupported URL scheme for page fetch: {}", parsed.scheme());
        }

        let resp = self.client.get(parsed).send().await?;
        let status = resp.status();
        if !status.is_success() {
            bail!("Page fetch failed ({status}) for {url}");
        }

        let body = resp.bytes().await?;
        let body = &body[..body.len().min(MAX_BODY_BYTES)];
        Ok(String::from_utf8_lossy(body).into_owned())
    }
}
