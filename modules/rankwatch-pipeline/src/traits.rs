// Trait abstractions for the pipeline's external collaborators.
//
// MetricQueryClient: search performance and conversion reporting APIs.
// WebSearcher: ranked web search for competitor discovery.
// PageFetcher: raw HTML retrieval for metadata scraping.
// TextGenerator: the generative text service behind recommendations.
//
// Each has a concrete impl over one of the client crates and a Noop impl used
// when the matching credential is absent. Mocks live in `testing.rs`.

use anyhow::{bail, Result};
use async_trait::async_trait;

use google_client::{
    AnalyticsDataClient, DateRange, FilterExpression, NamedField, RunReportRequest,
    SearchAnalyticsRequest, SearchConsoleClient,
};
use rankwatch_common::DateWindow;
use serp_client::{Locale, SerpApiClient};

// ---------------------------------------------------------------------------
// MetricQueryClient
// ---------------------------------------------------------------------------

/// Conversion metric requested from the analytics property.
pub const CONVERSION_METRIC: &str = "conversions";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    /// Property identifier in the source's own addressing scheme. Clients
    /// bound to a single property ignore it.
    pub site_id: String,
    pub window: DateWindow,
    pub dimensions: Vec<String>,
    /// Exact-match filter applied to the first dimension.
    pub filter: Option<String>,
    pub row_limit: u32,
}

/// Source-native row. `keys` follow `MetricQuery::dimensions`; `ctr` is a
/// fraction. Metrics a source does not report stay at 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    pub keys: Vec<String>,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
    pub conversions: f64,
}

#[async_trait]
pub trait MetricQueryClient: Send + Sync {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<SourceRow>>;
}

#[async_trait]
impl MetricQueryClient for SearchConsoleClient {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<SourceRow>> {
        let request = SearchAnalyticsRequest {
            start_date: query.window.start_iso(),
            end_date: query.window.end_iso(),
            dimensions: query.dimensions.clone(),
            row_limit: query.row_limit.min(google_client::MAX_ROW_LIMIT),
        };
        let rows = SearchConsoleClient::query(self, &query.site_id, &request).await?;
        Ok(rows
            .into_iter()
            .map(|r| SourceRow {
                keys: r.keys,
                clicks: r.clicks,
                impressions: r.impressions,
                ctr: r.ctr,
                position: r.position,
                conversions: 0.0,
            })
            .collect())
    }
}

#[async_trait]
impl MetricQueryClient for AnalyticsDataClient {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<SourceRow>> {
        let dimension_filter = match (&query.filter, query.dimensions.first()) {
            (Some(value), Some(field)) => Some(FilterExpression::exact(field.as_str(), value.as_str())),
            (Some(_), None) => bail!("filter given without a dimension to apply it to"),
            _ => None,
        };
        let request = RunReportRequest {
            date_ranges: vec![DateRange {
                start_date: query.window.start_iso(),
                end_date: query.window.end_iso(),
            }],
            dimensions: query.dimensions.iter().map(NamedField::new).collect(),
            metrics: vec![NamedField::new(CONVERSION_METRIC)],
            dimension_filter,
        };
        let rows = self.run_report(&request).await?;
        Ok(rows
            .into_iter()
            .map(|r| SourceRow {
                keys: r
                    .dimension_values
                    .iter()
                    .map(|v| v.value.clone())
                    .collect(),
                conversions: r.metric(0),
                ..SourceRow::default()
            })
            .collect())
    }
}

/// Used when no credential is configured for a metric source.
pub struct NoopMetricClient;

#[async_trait]
impl MetricQueryClient for NoopMetricClient {
    async fn query(&self, _query: &MetricQuery) -> Result<Vec<SourceRow>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// WebSearcher
// ---------------------------------------------------------------------------

/// One organic search result, in ranking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

impl SearchHit {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, keyword: &str, locale: &Locale, max_results: usize)
        -> Result<Vec<SearchHit>>;
}

#[async_trait]
impl WebSearcher for SerpApiClient {
    async fn search(
        &self,
        keyword: &str,
        locale: &Locale,
        max_results: usize,
    ) -> Result<Vec<SearchHit>> {
        let results = self.google_search(keyword, locale, max_results).await?;
        Ok(results
            .into_iter()
            .map(|r| SearchHit {
                url: r.link.unwrap_or_default(),
                title: r.title.unwrap_or_default(),
            })
            .collect())
    }
}

/// Used when no search API key is configured.
pub struct NoopSearcher;

#[async_trait]
impl WebSearcher for NoopSearcher {
    async fn search(
        &self,
        _keyword: &str,
        _locale: &Locale,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its raw HTML.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// TextGenerator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String>;
}

#[async_trait]
impl TextGenerator for ai_client::OpenAi {
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String> {
        self.chat_completion(system_instruction, user_prompt).await
    }
}

/// Used when no generative text credential is configured. Always fails, so
/// the composer falls back to its fixed message.
pub struct NoopGenerator;

#[async_trait]
impl TextGenerator for NoopGenerator {
    async fn complete(&self, _system_instruction: &str, _user_prompt: &str) -> Result<String> {
        bail!("no text generation service configured")
    }
}
