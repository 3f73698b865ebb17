use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::window::DateWindow;

/// Shown in place of a recommendation when the run had no metrics to work with.
pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "Insufficient data: no search performance metrics were available for this site, so no improvement recommendation could be made.";

// --- Metrics ---

/// Canonical per-page metrics for one fetch window.
///
/// `ctr` is a percentage in [0, 100]. `avg_position` is > 0 for rows from the
/// search-performance source; rows from the conversion source report 0.0
/// ("not reported") and only contribute `conversions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub page_key: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub avg_position: f64,
    pub conversions: u64,
}

impl MetricRow {
    pub fn new(page_key: impl Into<String>) -> Self {
        Self {
            page_key: page_key.into(),
            clicks: 0,
            impressions: 0,
            ctr: 0.0,
            avg_position: 0.0,
            conversions: 0,
        }
    }

    pub fn conversions_only(page_key: impl Into<String>, conversions: u64) -> Self {
        Self {
            conversions,
            ..Self::new(page_key)
        }
    }
}

/// A primary row after the supplementary sources have been joined onto it.
pub type MergedRecord = MetricRow;

/// Totals across a merged record set.
///
/// Serialized under the short keys the presentation layer reads
/// (`clicks`, `impressions`, `ctr`, `position`, `conversions`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateSummary {
    #[serde(rename = "clicks")]
    pub total_clicks: u64,
    #[serde(rename = "impressions")]
    pub total_impressions: u64,
    #[serde(rename = "ctr")]
    pub overall_ctr: f64,
    #[serde(rename = "position")]
    pub mean_position: f64,
    #[serde(rename = "conversions")]
    pub total_conversions: u64,
}

impl AggregateSummary {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// A page whose average position got worse between two windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankChange {
    pub page_key: String,
    pub previous_position: f64,
    pub current_position: f64,
    /// `current_position - previous_position`; positive means the page fell.
    pub change: f64,
}

// --- Competitors ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorEntry {
    /// 1-based, assigned from result order.
    pub rank: u32,
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Title and description scraped from a page. Empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
}

// --- Result ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    InsufficientData,
}

/// Chart-ready series, one entry per merged record in record order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub clicks: Vec<u64>,
    pub impressions: Vec<u64>,
    pub ctr: Vec<f64>,
    pub position: Vec<f64>,
    pub conversions: Vec<u64>,
}

impl ChartSeries {
    pub fn from_records(records: &[MergedRecord]) -> Self {
        Self {
            clicks: records.iter().map(|r| r.clicks).collect(),
            impressions: records.iter().map(|r| r.impressions).collect(),
            ctr: records.iter().map(|r| r.ctr).collect(),
            position: records.iter().map(|r| r.avg_position).collect(),
            conversions: records.iter().map(|r| r.conversions).collect(),
        }
    }
}

/// Output of one pipeline run. Every field is always present; skipped stages
/// leave empty lists, zero metrics or empty text behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub site: String,
    pub window: DateWindow,
    pub status: AnalysisStatus,
    pub target_page: String,
    pub keyword: Option<String>,
    #[serde(flatten)]
    pub summary: AggregateSummary,
    pub rows: Vec<MergedRecord>,
    pub table_html: String,
    pub chart_labels: Vec<String>,
    pub chart_data: ChartSeries,
    pub competitors: Vec<CompetitorEntry>,
    pub recommendation_text: String,
    pub rank_drops: Vec<RankChange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn summary_serializes_with_short_keys() {
        let summary = AggregateSummary {
            total_clicks: 10,
            total_impressions: 100,
            overall_ctr: 10.0,
            mean_position: 5.0,
            total_conversions: 2,
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["clicks"], 10);
        assert_eq!(json["impressions"], 100);
        assert_eq!(json["position"], 5.0);
    }

    #[test]
    fn result_flattens_summary() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let result = AnalysisResult {
            run_id: Uuid::new_v4(),
            site: "sc-domain:example.com".into(),
            window: DateWindow::new(day, day).unwrap(),
            status: AnalysisStatus::InsufficientData,
            target_page: "https://example.com/".into(),
            keyword: None,
            summary: AggregateSummary::zero(),
            rows: vec![],
            table_html: String::new(),
            chart_labels: vec![],
            chart_data: ChartSeries::default(),
            competitors: vec![],
            recommendation_text: INSUFFICIENT_DATA_MESSAGE.into(),
            rank_drops: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        for key in [
            "clicks",
            "impressions",
            "ctr",
            "position",
            "conversions",
            "table_html",
            "chart_labels",
            "chart_data",
            "competitors",
            "recommendation_text",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["status"], "insufficient_data");
    }
}
