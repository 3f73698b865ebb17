// Test mocks for the insight pipeline.
//
// One mock per trait boundary, each counting its calls so tests can assert a
// collaborator was never touched:
// - MockMetricClient (MetricQueryClient): rows per window or per filter value
// - MockSearcher (WebSearcher): fixed hit list, cut to the requested size
// - MockPageFetcher (PageFetcher): HashMap-based URL→HTML
// - MockGenerator (TextGenerator): fixed reply or failure
//
// Plus helpers for building source-native rows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use rankwatch_common::DateWindow;
use serp_client::Locale;

use crate::traits::{
    MetricQuery, MetricQueryClient, PageFetcher, SearchHit, SourceRow, TextGenerator, WebSearcher,
};

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

/// A search performance row keyed `[page, query]`, with a fractional CTR.
pub fn search_row(
    page: &str,
    query: &str,
    clicks: f64,
    impressions: f64,
    ctr: f64,
    position: f64,
) -> SourceRow {
    SourceRow {
        keys: vec![page.to_string(), query.to_string()],
        clicks,
        impressions,
        ctr,
        position,
        conversions: 0.0,
    }
}

/// A conversion report row keyed `[pagePath]`.
pub fn conversion_row(path: &str, conversions: f64) -> SourceRow {
    SourceRow {
        keys: vec![path.to_string()],
        conversions,
        ..SourceRow::default()
    }
}

// ---------------------------------------------------------------------------
// MockMetricClient
// ---------------------------------------------------------------------------

/// Unfiltered queries return the rows registered for their window, falling
/// back to the default rows. Filtered queries return the rows registered for
/// the filter value, or nothing.
pub struct MockMetricClient {
    default_rows: Vec<SourceRow>,
    by_window: HashMap<DateWindow, Vec<SourceRow>>,
    by_filter: HashMap<String, Vec<SourceRow>>,
    fail: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<MetricQuery>>,
}

impl MockMetricClient {
    pub fn new() -> Self {
        Self {
            default_rows: Vec::new(),
            by_window: HashMap::new(),
            by_filter: HashMap::new(),
            fail: false,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every query fails as if the source were unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_rows(mut self, rows: Vec<SourceRow>) -> Self {
        self.default_rows = rows;
        self
    }

    pub fn on_window(mut self, window: DateWindow, rows: Vec<SourceRow>) -> Self {
        self.by_window.insert(window, rows);
        self
    }

    /// Register a conversion count for an exact page path.
    pub fn on_filter(mut self, path: &str, conversions: f64) -> Self {
        self.by_filter
            .entry(path.to_string())
            .or_default()
            .push(conversion_row(path, conversions));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<MetricQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockMetricClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricQueryClient for MockMetricClient {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<SourceRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            bail!("MockMetricClient: source unavailable");
        }
        if let Some(filter) = &query.filter {
            return Ok(self.by_filter.get(filter).cloned().unwrap_or_default());
        }
        Ok(self
            .by_window
            .get(&query.window)
            .unwrap_or(&self.default_rows)
            .clone())
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

pub struct MockSearcher {
    hits: Vec<SearchHit>,
    fail: bool,
    calls: AtomicUsize,
    keywords: Mutex<Vec<String>>,
    requested: Mutex<Vec<usize>>,
}

impl MockSearcher {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            fail: false,
            calls: AtomicUsize::new(0),
            keywords: Mutex::new(Vec::new()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn keywords(&self) -> Vec<String> {
        self.keywords.lock().unwrap().clone()
    }

    /// `max_results` of every search, in call order.
    pub fn requested(&self) -> Vec<usize> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(
        &self,
        keyword: &str,
        _locale: &Locale,
        max_results: usize,
    ) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keywords.lock().unwrap().push(keyword.to_string());
        self.requested.lock().unwrap().push(max_results);
        if self.fail {
            bail!("MockSearcher: quota exceeded");
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// HashMap-based page fetcher. Returns `Err` for unregistered URLs.
pub struct MockPageFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockPageFetcher: no page registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

pub struct MockGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
    system_instructions: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            system_instructions: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            ..Self::replying("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn system_instructions(&self) -> Vec<String> {
        self.system_instructions.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.system_instructions
            .lock()
            .unwrap()
            .push(system_instruction.to_string());
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => bail!("MockGenerator: rate limited"),
        }
    }
}
