//! Pure aggregation over canonical metric rows: merge, summarize, pick the
//! target page and compute week-over-week rank drops. No I/O happens here.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use rankwatch_common::{normalize_page_key, AggregateSummary, MergedRecord, MetricRow, RankChange};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<MergedRecord>,
    pub summary: AggregateSummary,
    pub target: Option<MergedRecord>,
}

impl MergeOutcome {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            summary: AggregateSummary::zero(),
            target: None,
        }
    }
}

/// Join supplementary conversions onto the primary rows.
///
/// Output cardinality equals the number of distinct primary page keys; pages
/// only the supplementary source knows about are dropped. A page missing from
/// the supplementary rows gets 0 conversions.
pub fn merge(primary: &[MetricRow], supplementary: &[MetricRow]) -> MergeOutcome {
    if primary.is_empty() {
        return MergeOutcome::empty();
    }

    let mut conversions: HashMap<String, u64> = HashMap::new();
    for row in supplementary {
        let entry = conversions.entry(normalize_page_key(&row.page_key)).or_insert(0);
        *entry = entry.saturating_add(row.conversions);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(primary.len());
    for row in primary {
        let page_key = normalize_page_key(&row.page_key);
        if !seen.insert(page_key.clone()) {
            debug!(page_key, "Duplicate primary row ignored");
            continue;
        }
        records.push(MergedRecord {
            conversions: conversions.get(&page_key).copied().unwrap_or(0),
            page_key,
            ..row.clone()
        });
    }

    let summary = summarize(&records);
    let target = select_target(&records).cloned();
    MergeOutcome {
        records,
        summary,
        target,
    }
}

/// Totals across records. CTR is derived from the summed counts, position is
/// the plain mean across records.
pub fn summarize(records: &[MergedRecord]) -> AggregateSummary {
    if records.is_empty() {
        return AggregateSummary::zero();
    }

    let total_clicks = records.iter().map(|r| r.clicks).fold(0u64, u64::saturating_add);
    let total_impressions = records
        .iter()
        .map(|r| r.impressions)
        .fold(0u64, u64::saturating_add);
    let total_conversions = records
        .iter()
        .map(|r| r.conversions)
        .fold(0u64, u64::saturating_add);

    let overall_ctr = if total_impressions == 0 {
        0.0
    } else {
        total_clicks as f64 / total_impressions as f64 * 100.0
    };
    let mean_position =
        records.iter().map(|r| r.avg_position).sum::<f64>() / records.len() as f64;

    AggregateSummary {
        total_clicks,
        total_impressions,
        overall_ctr,
        mean_position,
        total_conversions,
    }
}

/// The worst-ranked page: maximum average position, earliest record on ties.
pub fn select_target(records: &[MergedRecord]) -> Option<&MergedRecord> {
    let mut best: Option<&MergedRecord> = None;
    for record in records {
        match best {
            Some(current) if record.avg_position <= current.avg_position => {}
            _ => best = Some(record),
        }
    }
    best
}

/// Pages whose average position got worse since the previous window, largest
/// drop first. Pages missing from either window, or without a reported
/// position, are not compared.
pub fn rank_drops(previous: &[MetricRow], current: &[MergedRecord]) -> Vec<RankChange> {
    let mut before: HashMap<String, f64> = HashMap::new();
    for row in previous {
        before
            .entry(normalize_page_key(&row.page_key))
            .or_insert(row.avg_position);
    }

    let mut drops: Vec<RankChange> = current
        .iter()
        .filter_map(|record| {
            let previous_position = *before.get(&normalize_page_key(&record.page_key))?;
            if previous_position <= 0.0 || record.avg_position <= 0.0 {
                return None;
            }
            let change = record.avg_position - previous_position;
            (change > 0.0).then(|| RankChange {
                page_key: record.page_key.clone(),
                previous_position,
                current_position: record.avg_position,
                change,
            })
        })
        .collect();

    drops.sort_by(|a, b| b.change.total_cmp(&a.change));
    drops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(page: &str, clicks: u64, impressions: u64, position: f64) -> MetricRow {
        MetricRow {
            page_key: page.to_string(),
            clicks,
            impressions,
            ctr: if impressions == 0 {
                0.0
            } else {
                clicks as f64 / impressions as f64 * 100.0
            },
            avg_position: position,
            conversions: 0,
        }
    }

    #[test]
    fn empty_primary_short_circuits() {
        let outcome = merge(&[], &[MetricRow::conversions_only("https://example.com/a", 9)]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.summary, AggregateSummary::zero());
        assert!(outcome.target.is_none());
    }

    #[test]
    fn conversions_join_on_normalized_key() {
        let outcome = merge(
            &[row("https://example.com/a", 10, 100, 3.0)],
            &[
                MetricRow::conversions_only("https://www.example.com/a/", 2),
                MetricRow::conversions_only("https://example.com/a", 1),
                MetricRow::conversions_only("https://example.com/elsewhere", 50),
            ],
        );
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].conversions, 3);
        assert_eq!(outcome.summary.total_conversions, 3);
    }

    #[test]
    fn duplicate_primary_keys_keep_first() {
        let outcome = merge(
            &[
                row("https://example.com/a", 10, 100, 3.0),
                row("https://example.com/a/", 99, 999, 40.0),
            ],
            &[],
        );
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].clicks, 10);
    }

    #[test]
    fn summary_ctr_is_derived_from_totals() {
        let summary = summarize(&[
            row("https://example.com/a", 10, 100, 2.0),
            row("https://example.com/b", 0, 300, 6.0),
        ]);
        assert_eq!(summary.total_clicks, 10);
        assert_eq!(summary.total_impressions, 400);
        assert!((summary.overall_ctr - 2.5).abs() < 1e-9);
        assert!((summary.mean_position - 4.0).abs() < 1e-9);
    }

    #[test]
    fn zero_impressions_give_zero_ctr() {
        let summary = summarize(&[row("https://example.com/a", 0, 0, 1.0)]);
        assert_eq!(summary.overall_ctr, 0.0);
    }

    #[test]
    fn target_ties_go_to_first_record() {
        let records = vec![
            row("https://example.com/a", 1, 10, 7.0),
            row("https://example.com/b", 1, 10, 7.0),
            row("https://example.com/c", 1, 10, 2.0),
        ];
        assert_eq!(select_target(&records).unwrap().page_key, "https://example.com/a");
        assert!(select_target(&[]).is_none());
    }

    #[test]
    fn rank_drops_sorted_by_change() {
        let previous = vec![
            row("https://example.com/a", 0, 0, 3.0),
            row("https://example.com/b", 0, 0, 5.0),
            row("https://example.com/c", 0, 0, 9.0),
        ];
        let current = vec![
            row("https://example.com/a", 0, 0, 4.0),
            row("https://example.com/b", 0, 0, 9.5),
            row("https://example.com/c", 0, 0, 2.0),
            row("https://example.com/new", 0, 0, 30.0),
        ];
        let drops = rank_drops(&previous, &current);
        let keys: Vec<_> = drops.iter().map(|d| d.page_key.as_str()).collect();
        assert_eq!(keys, vec!["https://example.com/b", "https://example.com/a"]);
        assert!((drops[0].change - 4.5).abs() < 1e-9);
    }
}
