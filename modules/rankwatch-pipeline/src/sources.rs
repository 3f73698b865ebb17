//! Metric source adapters.
//!
//! Both adapters translate source-native rows into canonical `MetricRow`s and
//! absorb transport failures: an unreachable or erroring source is logged and
//! reported as "no rows". Only caller mistakes (bad window, bad site key)
//! surface as `SourceError`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use rankwatch_common::{
    normalize_page_key, page_path, DateWindow, InsightError, MetricRow, SiteKey, SourceError,
};

use crate::traits::{MetricQuery, MetricQueryClient, SourceRow};

/// Rows requested per search performance query.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

const PAGE_DIMENSION: &str = "page";
const QUERY_DIMENSION: &str = "query";
const PAGE_PATH_DIMENSION: &str = "pagePath";

/// Collapsed page rows plus the search terms seen alongside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceReport {
    /// One row per distinct page_key, in order of first appearance.
    pub rows: Vec<MetricRow>,
    /// Distinct non-empty search terms, in upstream order.
    pub search_terms: Vec<String>,
}

impl PerformanceReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First non-empty search term, used as the competitor keyword.
    pub fn keyword(&self) -> Option<&str> {
        self.search_terms.first().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Search performance
// ---------------------------------------------------------------------------

pub struct SearchPerformanceSource {
    client: Arc<dyn MetricQueryClient>,
    row_limit: u32,
}

impl SearchPerformanceSource {
    pub fn new(client: Arc<dyn MetricQueryClient>) -> Self {
        Self {
            client,
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Canonical page rows for the window.
    pub async fn fetch(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
        site_key: &str,
    ) -> Result<Vec<MetricRow>, SourceError> {
        Ok(self.fetch_report(window_start, window_end, site_key).await?.rows)
    }

    /// Like [`fetch`](Self::fetch) but also keeps the search terms.
    pub async fn fetch_report(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
        site_key: &str,
    ) -> Result<PerformanceReport, SourceError> {
        let window = DateWindow::new(window_start, window_end)?;
        let site = SiteKey::resolve(site_key)
            .map_err(|e| SourceError::InvalidSiteKey(e.to_string()))?;

        let query = MetricQuery {
            site_id: site.source_id(),
            window,
            dimensions: vec![PAGE_DIMENSION.to_string(), QUERY_DIMENSION.to_string()],
            filter: None,
            row_limit: self.row_limit,
        };

        match self.client.query(&query).await {
            Ok(rows) => {
                let report = collapse_rows(rows);
                debug!(
                    site = %site,
                    %window,
                    pages = report.rows.len(),
                    terms = report.search_terms.len(),
                    "Search performance fetched"
                );
                Ok(report)
            }
            Err(e) => {
                let err = InsightError::SourceUnavailable(format!("search performance: {e:#}"));
                warn!(site = %site, %window, error = %err, "Continuing without search performance rows");
                Ok(PerformanceReport::default())
            }
        }
    }
}

#[derive(Default)]
struct PageAccumulator {
    clicks: f64,
    impressions: f64,
    weighted_position: f64,
    position_sum: f64,
    ctr_sum: f64,
    rows: u32,
}

impl PageAccumulator {
    fn add(&mut self, row: &SourceRow) {
        let clicks = row.clicks.max(0.0);
        let impressions = row.impressions.max(0.0);
        self.clicks += clicks;
        self.impressions += impressions;
        self.weighted_position += row.position * impressions;
        self.position_sum += row.position;
        self.ctr_sum += row.ctr;
        self.rows += 1;
    }

    fn into_row(self, page_key: String) -> MetricRow {
        let clicks = self.clicks.round() as u64;
        let impressions = self.impressions.round() as u64;
        let rows = f64::from(self.rows.max(1));

        let ctr = if impressions > 0 {
            clicks as f64 / impressions as f64 * 100.0
        } else {
            self.ctr_sum / rows * 100.0
        };
        let avg_position = if self.impressions > 0.0 {
            self.weighted_position / self.impressions
        } else {
            self.position_sum / rows
        };

        MetricRow {
            page_key,
            clicks,
            impressions,
            ctr: if ctr.is_finite() { ctr.clamp(0.0, 100.0) } else { 0.0 },
            avg_position,
            conversions: 0,
        }
    }
}

/// Collapse `(page, query)` rows into one row per normalized page.
///
/// Clicks and impressions are summed, CTR is re-derived as a percentage and
/// position is impression-weighted. Rows without a page key are dropped.
pub fn collapse_rows(rows: Vec<SourceRow>) -> PerformanceReport {
    let mut order: Vec<String> = Vec::new();
    let mut pages: HashMap<String, PageAccumulator> = HashMap::new();
    let mut search_terms: Vec<String> = Vec::new();

    for row in &rows {
        if let Some(term) = row.keys.get(1).map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !search_terms.iter().any(|t| t == term) {
                search_terms.push(term.to_string());
            }
        }

        let page_key = normalize_page_key(row.keys.first().map(String::as_str).unwrap_or(""));
        if page_key.is_empty() {
            continue;
        }
        pages
            .entry(page_key.clone())
            .or_insert_with(|| {
                order.push(page_key);
                PageAccumulator::default()
            })
            .add(row);
    }

    let rows = order
        .into_iter()
        .filter_map(|key| pages.remove(&key).map(|acc| acc.into_row(key)))
        .collect();

    PerformanceReport { rows, search_terms }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub struct ConversionSource {
    client: Arc<dyn MetricQueryClient>,
}

impl ConversionSource {
    pub fn new(client: Arc<dyn MetricQueryClient>) -> Self {
        Self { client }
    }

    /// Conversions recorded for one page path. `None` when the source has no
    /// row for the page or could not be reached.
    pub async fn fetch_page(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
        path: &str,
    ) -> Result<Option<MetricRow>, SourceError> {
        let window = DateWindow::new(window_start, window_end)?;
        let path = page_path(path);

        let query = MetricQuery {
            site_id: String::new(),
            window,
            dimensions: vec![PAGE_PATH_DIMENSION.to_string()],
            filter: Some(path.clone()),
            row_limit: 1,
        };

        let rows = match self.client.query(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                let err = InsightError::SourceUnavailable(format!("conversions: {e:#}"));
                warn!(path = %path, %window, error = %err, "Conversions read as 0 for page");
                return Ok(None);
            }
        };
        if rows.is_empty() {
            return Ok(None);
        }

        let conversions = rows
            .iter()
            .map(|r| r.conversions.max(0.0).round() as u64)
            .fold(0u64, u64::saturating_add);
        Ok(Some(MetricRow::conversions_only(path, conversions)))
    }
}
