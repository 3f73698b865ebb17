//! Merge and target-selection behavior over hand-built row sets.

use std::collections::HashSet;

use rankwatch_common::{normalize_page_key, AggregateSummary, MetricRow};
use rankwatch_pipeline::aggregate::{merge, select_target, summarize};

fn row(page: &str, clicks: u64, impressions: u64, ctr: f64, position: f64) -> MetricRow {
    MetricRow {
        page_key: page.to_string(),
        clicks,
        impressions,
        ctr,
        avg_position: position,
        conversions: 0,
    }
}

fn sample_sets() -> Vec<Vec<MetricRow>> {
    vec![
        vec![row("/a", 10, 100, 10.0, 5.0)],
        vec![
            row("https://example.com/a", 1, 10, 10.0, 2.0),
            row("https://www.example.com/a/", 2, 20, 10.0, 3.0),
            row("http://example.com/b", 0, 0, 0.0, 9.0),
        ],
        vec![
            row("https://example.com/", 5, 50, 10.0, 1.5),
            row("https://example.com", 5, 50, 10.0, 1.5),
            row("https://example.com/x?utm=1", 3, 0, 0.0, 12.0),
            row("https://example.com/y#top", 4, 40, 10.0, 12.0),
        ],
    ]
}

#[test]
fn single_row_without_conversions() {
    let outcome = merge(&[row("/a", 10, 100, 10.0, 5.0)], &[]);

    assert_eq!(outcome.records, vec![row("/a", 10, 100, 10.0, 5.0)]);
    assert_eq!(
        outcome.summary,
        AggregateSummary {
            total_clicks: 10,
            total_impressions: 100,
            overall_ctr: 10.0,
            mean_position: 5.0,
            total_conversions: 0,
        }
    );
    assert_eq!(outcome.target.unwrap().page_key, "/a");
}

#[test]
fn higher_position_number_is_the_target() {
    let outcome = merge(
        &[
            row("https://example.com/top", 20, 100, 20.0, 3.0),
            row("https://example.com/deep", 1, 100, 1.0, 8.0),
        ],
        &[],
    );
    assert_eq!(outcome.target.unwrap().avg_position, 8.0);
}

#[test]
fn empty_supplementary_means_zero_conversions() {
    for primary in sample_sets() {
        let outcome = merge(&primary, &[]);
        assert!(outcome.records.iter().all(|r| r.conversions == 0));
    }
}

#[test]
fn one_record_per_distinct_primary_key() {
    let supplementary = vec![
        MetricRow::conversions_only("https://example.com/a", 2),
        MetricRow::conversions_only("https://example.com/only-in-analytics", 7),
    ];
    for primary in sample_sets() {
        let distinct: HashSet<String> = primary
            .iter()
            .map(|r| normalize_page_key(&r.page_key))
            .collect();
        assert_eq!(merge(&primary, &[]).records.len(), distinct.len());
        assert_eq!(merge(&primary, &supplementary).records.len(), distinct.len());
    }
}

#[test]
fn ctr_is_zero_when_nothing_was_shown() {
    let summary = summarize(&[
        row("https://example.com/a", 0, 0, 0.0, 4.0),
        row("https://example.com/b", 0, 0, 0.0, 6.0),
    ]);
    assert_eq!(summary.total_impressions, 0);
    assert_eq!(summary.overall_ctr, 0.0);
    assert!(!summary.overall_ctr.is_nan());
}

#[test]
fn target_selection_is_deterministic() {
    for primary in sample_sets() {
        let first = merge(&primary, &[]).target.map(|t| t.page_key);
        let second = merge(&primary, &[]).target.map(|t| t.page_key);
        assert_eq!(first, second);
    }
}

#[test]
fn position_ties_resolve_to_earliest_record() {
    let records = merge(&sample_sets()[2], &[]).records;
    assert_eq!(
        select_target(&records).unwrap().page_key,
        "https://example.com/x"
    );
}

#[test]
fn empty_primary_returns_zero_summary() {
    let outcome = merge(&[], &[]);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.summary, AggregateSummary::zero());
    assert_eq!(outcome.summary.mean_position, 0.0);
    assert!(outcome.target.is_none());
}
