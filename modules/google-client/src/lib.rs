pub mod error;
pub mod types;

pub use error::{GoogleError, Result};
pub use types::{
    DateRange, FilterExpression, NamedField, ReportRow, RunReportRequest, RunReportResponse,
    SearchAnalyticsRequest, SearchAnalyticsResponse, SearchAnalyticsRow,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

const SEARCH_CONSOLE_URL: &str = "https://searchconsole.googleapis.com/webmasters/v3";
const ANALYTICS_DATA_URL: &str = "https://analyticsdata.googleapis.com/v1beta";

/// Upper bound the Search Console API accepts per request.
pub const MAX_ROW_LIMIT: u32 = 25_000;

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

async fn post_json<B: Serialize, T: DeserializeOwned>(
    http: &reqwest::Client,
    url: Url,
    token: &str,
    body: &B,
) -> Result<T> {
    let resp = http.post(url).bearer_auth(token).json(body).send().await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let text = resp.text().await?;
    Ok(serde_json::from_str(&text)?)
}

// --- Search Console ---

/// Search Console `searchAnalytics.query` client.
///
/// Authenticates with a caller-supplied OAuth access token; obtaining and
/// refreshing that token is not this client's concern.
pub struct SearchConsoleClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl SearchConsoleClient {
    pub fn new(token: String, timeout: Duration) -> Self {
        Self {
            client: build_http(timeout),
            token,
            base_url: SEARCH_CONSOLE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// `{base}/sites/{site_id}/searchAnalytics/query`, with the site id
    /// encoded as one path segment.
    fn query_url(&self, site_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| GoogleError::Parse(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["sites", site_id, "searchAnalytics", "query"]);
        Ok(url)
    }

    /// Query search performance rows for a property (`sc-domain:...` or a URL prefix).
    pub async fn query(
        &self,
        site_id: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<Vec<SearchAnalyticsRow>> {
        let url = self.query_url(site_id)?;
        tracing::debug!(
            site_id,
            start = %request.start_date,
            end = %request.end_date,
            dimensions = ?request.dimensions,
            "Search Console query"
        );

        let resp: SearchAnalyticsResponse =
            post_json(&self.client, url, &self.token, request).await?;
        tracing::debug!(site_id, rows = resp.rows.len(), "Search Console query complete");
        Ok(resp.rows)
    }
}

// --- Analytics Data API ---

/// Analytics Data API `runReport` client for one property.
pub struct AnalyticsDataClient {
    client: reqwest::Client,
    token: String,
    property_id: String,
    base_url: String,
}

impl AnalyticsDataClient {
    pub fn new(token: String, property_id: String, timeout: Duration) -> Self {
        Self {
            client: build_http(timeout),
            token,
            property_id,
            base_url: ANALYTICS_DATA_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    fn report_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/properties/{}:runReport",
            self.base_url, self.property_id
        ))?)
    }

    pub async fn run_report(&self, request: &RunReportRequest) -> Result<Vec<ReportRow>> {
        let url = self.report_url()?;
        tracing::debug!(property = %self.property_id, "Analytics runReport");

        let resp: RunReportResponse = post_json(&self.client, url, &self.token, request).await?;
        Ok(resp.rows)
    }
}
