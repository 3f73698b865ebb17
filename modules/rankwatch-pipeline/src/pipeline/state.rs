use uuid::Uuid;

use rankwatch_common::{
    AggregateSummary, CompetitorEntry, DateWindow, MergedRecord, MetricRow, RankChange, SiteKey,
};

use crate::sources::PerformanceReport;

/// Orchestrator stages. Transitions:
///
/// ```text
/// START -> FETCH_METRICS -> FALLBACK_NO_METRICS ---------------------------> ASSEMBLE -> DONE
///                        -> MERGE -> SELECT_TARGET -> SKIP_COMPETITORS  -> SKIP_RECOMMENDATION    -> ASSEMBLE
///                                                  -> FETCH_COMPETITORS -> SKIP_RECOMMENDATION    -> ASSEMBLE
///                                                                       -> COMPOSE_RECOMMENDATION -> ASSEMBLE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    FetchMetrics,
    FallbackNoMetrics,
    Merge,
    SelectTarget,
    SkipCompetitors,
    FetchCompetitors,
    SkipRecommendation,
    ComposeRecommendation,
    Assemble,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Start => "START",
            Stage::FetchMetrics => "FETCH_METRICS",
            Stage::FallbackNoMetrics => "FALLBACK_NO_METRICS",
            Stage::Merge => "MERGE",
            Stage::SelectTarget => "SELECT_TARGET",
            Stage::SkipCompetitors => "SKIP_COMPETITORS",
            Stage::FetchCompetitors => "FETCH_COMPETITORS",
            Stage::SkipRecommendation => "SKIP_RECOMMENDATION",
            Stage::ComposeRecommendation => "COMPOSE_RECOMMENDATION",
            Stage::Assemble => "ASSEMBLE",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Everything one run accumulates on its way to ASSEMBLE. Owned by a single
/// invocation, never shared.
#[derive(Debug)]
pub(crate) struct RunState {
    pub run_id: Uuid,
    pub site: SiteKey,
    pub window: DateWindow,
    pub report: PerformanceReport,
    pub previous_rows: Vec<MetricRow>,
    pub records: Vec<MergedRecord>,
    pub summary: AggregateSummary,
    pub target: Option<MergedRecord>,
    pub target_page: String,
    pub keyword: Option<String>,
    pub competitors: Vec<CompetitorEntry>,
    pub recommendation: String,
    pub rank_drops: Vec<RankChange>,
    pub insufficient_data: bool,
}

impl RunState {
    pub fn new(site: SiteKey, window: DateWindow) -> Self {
        let target_page = site.root_page_key();
        Self {
            run_id: Uuid::new_v4(),
            site,
            window,
            report: PerformanceReport::default(),
            previous_rows: Vec::new(),
            records: Vec::new(),
            summary: AggregateSummary::zero(),
            target: None,
            target_page,
            keyword: None,
            competitors: Vec::new(),
            recommendation: String::new(),
            rank_drops: Vec::new(),
            insufficient_data: false,
        }
    }
}
