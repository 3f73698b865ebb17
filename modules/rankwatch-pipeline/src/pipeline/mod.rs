//! Insight pipeline orchestrator.
//!
//! Runs one analysis as an explicit state machine (see [`Stage`]). Stage
//! failures degrade to empty output for that stage; only malformed caller
//! input and cancellation end a run with an error.

mod state;
mod stats;

pub use state::Stage;
pub use stats::RunStats;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use google_client::{AnalyticsDataClient, SearchConsoleClient};
use rankwatch_common::{
    page_path, AnalysisResult, AnalysisStatus, ChartSeries, Config, DateWindow, InsightError,
    MetricRow, SiteKey, INSUFFICIENT_DATA_MESSAGE,
};
use serp_client::{Locale, SerpApiClient};

use crate::aggregate;
use crate::competitors::{CompetitorFetcher, DEFAULT_COMPETITOR_LIMIT};
use crate::fetcher::HttpPageFetcher;
use crate::recommend::{RecommendationComposer, RECOMMENDATION_UNAVAILABLE};
use crate::render;
use crate::sources::{ConversionSource, SearchPerformanceSource};
use crate::traits::{
    MetricQueryClient, NoopGenerator, NoopMetricClient, NoopSearcher, PageFetcher, TextGenerator,
    WebSearcher,
};
use state::RunState;

// ---------------------------------------------------------------------------
// Dependencies and options
// ---------------------------------------------------------------------------

/// External collaborators, shared read-only across runs.
#[derive(Clone, TypedBuilder)]
pub struct PipelineDeps {
    pub search_console: Arc<dyn MetricQueryClient>,
    #[builder(default = Arc::new(NoopMetricClient))]
    pub conversions: Arc<dyn MetricQueryClient>,
    #[builder(default = Arc::new(NoopSearcher))]
    pub searcher: Arc<dyn WebSearcher>,
    #[builder(default = Arc::new(HttpPageFetcher::default()))]
    pub pages: Arc<dyn PageFetcher>,
    #[builder(default = Arc::new(NoopGenerator))]
    pub generator: Arc<dyn TextGenerator>,
}

impl PipelineDeps {
    /// Production collaborators. A missing credential swaps in the Noop
    /// implementation for that collaborator.
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.http_timeout;

        let search_console: Arc<dyn MetricQueryClient> = match &config.google_access_token {
            Some(token) => Arc::new(SearchConsoleClient::new(token.clone(), timeout)),
            None => {
                warn!("GOOGLE_ACCESS_TOKEN not set, search performance data unavailable");
                Arc::new(NoopMetricClient)
            }
        };

        let conversions: Arc<dyn MetricQueryClient> =
            match (&config.google_access_token, &config.ga_property_id) {
                (Some(token), Some(property)) => Arc::new(AnalyticsDataClient::new(
                    token.clone(),
                    property.clone(),
                    timeout,
                )),
                _ => {
                    info!("GA_PROPERTY_ID not set, conversions will read as 0");
                    Arc::new(NoopMetricClient)
                }
            };

        let searcher: Arc<dyn WebSearcher> = match &config.serpapi_key {
            Some(key) => Arc::new(SerpApiClient::new(key.clone(), timeout)),
            None => {
                warn!("SERPAPI_KEY not set, skipping competitor search");
                Arc::new(NoopSearcher)
            }
        };

        let generator: Arc<dyn TextGenerator> = match &config.openai_api_key {
            Some(key) => Arc::new(
                ai_client::OpenAi::new(key.clone(), config.openai_model.clone())
                    .with_timeout(config.generation_timeout),
            ),
            None => {
                warn!("OPENAI_API_KEY not set, recommendations will use the fallback text");
                Arc::new(NoopGenerator)
            }
        };

        Self {
            search_console,
            conversions,
            searcher,
            pages: Arc::new(HttpPageFetcher::new(timeout)),
            generator,
        }
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineOptions {
    #[builder(default = DEFAULT_COMPETITOR_LIMIT)]
    pub competitor_limit: usize,
    /// Conversion lookups in flight at once during MERGE.
    #[builder(default = 4)]
    pub conversion_concurrency: usize,
    /// Also fetch the preceding window and report rank drops.
    #[builder(default = true)]
    pub compare_previous_window: bool,
    /// Scrape the target page's own description into the prompt.
    #[builder(default = true)]
    pub describe_target: bool,
    #[builder(default = Locale::new("ja", "jp"))]
    pub locale: Locale,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self::builder()
            .competitor_limit(config.competitor_limit)
            .conversion_concurrency(config.conversion_concurrency)
            .locale(Locale::new(
                config.serp_language.clone(),
                config.serp_country.clone(),
            ))
            .build()
    }
}

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Free-form site input: `example.com`, `https://example.com/blog/`,
    /// `sc-domain:example.com`.
    pub site: String,
    /// Anchor for the default reporting window.
    pub today: NaiveDate,
    /// Explicit inclusive window, overriding the default.
    pub window: Option<(NaiveDate, NaiveDate)>,
    /// Skip metric collection and return the insufficient-data result.
    pub skip_metrics: bool,
    /// Checked between stages. Setting it ends the run with `Cancelled`.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RunRequest {
    pub fn new(site: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            site: site.into(),
            today,
            window: None,
            skip_metrics: false,
            cancel: None,
        }
    }

    pub fn with_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.window = Some((start, end));
        self
    }

    pub fn skip_metrics(mut self) -> Self {
        self.skip_metrics = true;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: AnalysisResult,
    pub stats: RunStats,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct InsightPipeline {
    search: SearchPerformanceSource,
    conversions: ConversionSource,
    competitors: CompetitorFetcher,
    composer: RecommendationComposer,
    options: PipelineOptions,
}

impl InsightPipeline {
    pub fn new(deps: PipelineDeps, options: PipelineOptions) -> Self {
        let mut composer = RecommendationComposer::new(deps.generator.clone());
        if options.describe_target {
            composer = composer.with_page_fetcher(deps.pages.clone());
        }
        Self {
            search: SearchPerformanceSource::new(deps.search_console.clone()),
            conversions: ConversionSource::new(deps.conversions.clone()),
            competitors: CompetitorFetcher::new(
                deps.searcher.clone(),
                deps.pages.clone(),
                options.locale.clone(),
            ),
            composer,
            options,
        }
    }

    /// Run one analysis. Fails only on invalid input or cancellation.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, InsightError> {
        let site = SiteKey::resolve(&request.site)?;
        let window = match request.window {
            Some((start, end)) => DateWindow::new(start, end)?,
            None => DateWindow::reporting_default(request.today),
        };

        let mut state = RunState::new(site, window);
        let mut stats = RunStats::default();
        let mut result = None;
        let mut stage = Stage::Start;

        info!(run_id = %state.run_id, site = %state.site, %window, "Insight run starting");

        loop {
            stats.stages.push(stage);
            if stage == Stage::Done {
                break;
            }
            if request.is_cancelled() {
                warn!(run_id = %state.run_id, %stage, "Insight run cancelled");
                return Err(InsightError::Cancelled(stage.to_string()));
            }
            debug!(run_id = %state.run_id, %stage, "Entering stage");

            stage = match stage {
                Stage::Start => Stage::FetchMetrics,
                Stage::FetchMetrics => {
                    match self.fetch_metrics(request, &mut state, &mut stats).await {
                        Ok(next) => next,
                        Err(e) => {
                            warn!(run_id = %state.run_id, error = %e, "Metric fetch failed, treating as no data");
                            Stage::FallbackNoMetrics
                        }
                    }
                }
                Stage::FallbackNoMetrics => {
                    state.insufficient_data = true;
                    Stage::Assemble
                }
                Stage::Merge => self.merge(&mut state, &mut stats).await,
                Stage::SelectTarget => self.select_target(&mut state),
                Stage::SkipCompetitors => Stage::SkipRecommendation,
                Stage::FetchCompetitors => self.fetch_competitors(&mut state, &mut stats).await,
                Stage::SkipRecommendation => Stage::Assemble,
                Stage::ComposeRecommendation => {
                    self.compose_recommendation(&mut state, &mut stats).await
                }
                Stage::Assemble => {
                    result = Some(assemble(&mut state));
                    Stage::Done
                }
                Stage::Done => Stage::Done,
            };
        }

        let result = result.ok_or_else(|| {
            InsightError::Anyhow(anyhow::anyhow!("run finished without assembling a result"))
        })?;
        info!(run_id = %result.run_id, status = ?result.status, "Insight run complete. {stats}");
        Ok(RunOutcome { result, stats })
    }

    async fn fetch_metrics(
        &self,
        request: &RunRequest,
        state: &mut RunState,
        stats: &mut RunStats,
    ) -> Result<Stage> {
        if request.skip_metrics {
            info!(run_id = %state.run_id, "Metric collection skipped on request");
            return Ok(Stage::FallbackNoMetrics);
        }

        let site_id = state.site.source_id();
        state.report = self
            .search
            .fetch_report(state.window.start, state.window.end, &site_id)
            .await?;
        stats.pages_fetched = state.report.rows.len() as u32;
        stats.search_terms = state.report.search_terms.len() as u32;

        if state.report.is_empty() {
            let reason = InsightError::NoData(format!("no search performance rows for {}", state.window));
            info!(run_id = %state.run_id, %reason, "Falling back to insufficient data");
            return Ok(Stage::FallbackNoMetrics);
        }

        if self.options.compare_previous_window {
            let previous = state.window.previous();
            state.previous_rows = match self.search.fetch(previous.start, previous.end, &site_id).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(run_id = %state.run_id, window = %previous, error = %e, "Previous window unavailable, skipping rank comparison");
                    Vec::new()
                }
            };
            stats.previous_pages = state.previous_rows.len() as u32;
        }

        Ok(Stage::Merge)
    }

    async fn merge(&self, state: &mut RunState, stats: &mut RunStats) -> Stage {
        let mut seen = HashSet::new();
        let pages: Vec<String> = state
            .report
            .rows
            .iter()
            .map(|r| r.page_key.clone())
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let window = state.window;
        let run_id = state.run_id;
        let lookups: Vec<(String, Option<MetricRow>)> = stream::iter(pages)
            .map(|page_key| async move {
                let path = page_path(&page_key);
                match self.conversions.fetch_page(window.start, window.end, &path).await {
                    Ok(row) => (page_key, row),
                    Err(e) => {
                        warn!(%run_id, page = %page_key, error = %e, "Conversion lookup rejected");
                        (page_key, None)
                    }
                }
            })
            .buffer_unordered(self.options.conversion_concurrency.max(1))
            .collect()
            .await;

        stats.conversion_lookups = lookups.len() as u32;
        let supplementary: Vec<MetricRow> = lookups
            .into_iter()
            .filter_map(|(page_key, row)| {
                row.map(|r| MetricRow::conversions_only(page_key, r.conversions))
            })
            .collect();
        stats.conversion_hits = supplementary.len() as u32;

        let outcome = aggregate::merge(&state.report.rows, &supplementary);
        state.rank_drops = aggregate::rank_drops(&state.previous_rows, &outcome.records);
        stats.rank_drops = state.rank_drops.len() as u32;
        state.records = outcome.records;
        state.summary = outcome.summary;
        state.target = outcome.target;
        Stage::SelectTarget
    }

    fn select_target(&self, state: &mut RunState) -> Stage {
        state.target_page = match &state.target {
            Some(target) => target.page_key.clone(),
            None => state.site.root_page_key(),
        };
        state.keyword = state.report.keyword().map(str::to_string);

        info!(
            run_id = %state.run_id,
            target = %state.target_page,
            keyword = ?state.keyword,
            "Target selected"
        );

        match state.keyword {
            Some(_) => Stage::FetchCompetitors,
            None => Stage::SkipCompetitors,
        }
    }

    async fn fetch_competitors(&self, state: &mut RunState, stats: &mut RunStats) -> Stage {
        let keyword = state.keyword.as_deref().unwrap_or("");
        state.competitors = self
            .competitors
            .top_competitors(keyword, self.options.competitor_limit)
            .await;
        stats.competitors_found = state.competitors.len() as u32;

        if state.competitors.is_empty() {
            Stage::SkipRecommendation
        } else {
            Stage::ComposeRecommendation
        }
    }

    async fn compose_recommendation(&self, state: &mut RunState, stats: &mut RunStats) -> Stage {
        stats.recommendation_attempted = true;
        state.recommendation = self
            .composer
            .compose(&state.target_page, &state.competitors, &state.records)
            .await;
        stats.recommendation_generated = state.recommendation != RECOMMENDATION_UNAVAILABLE;
        Stage::Assemble
    }
}

/// Build the result from whatever the run accumulated. Every field is
/// populated; skipped stages leave empty or zero values.
fn assemble(state: &mut RunState) -> AnalysisResult {
    let records = std::mem::take(&mut state.records);
    let (status, recommendation_text) = if state.insufficient_data {
        (
            AnalysisStatus::InsufficientData,
            INSUFFICIENT_DATA_MESSAGE.to_string(),
        )
    } else {
        (
            AnalysisStatus::Complete,
            std::mem::take(&mut state.recommendation),
        )
    };

    AnalysisResult {
        run_id: state.run_id,
        site: state.site.to_string(),
        window: state.window,
        status,
        target_page: state.target_page.clone(),
        keyword: state.keyword.clone(),
        summary: state.summary,
        table_html: render::render_table_html(&records),
        chart_labels: render::chart_labels(&records),
        chart_data: ChartSeries::from_records(&records),
        rows: records,
        competitors: std::mem::take(&mut state.competitors),
        recommendation_text,
        rank_drops: std::mem::take(&mut state.rank_drops),
    }
}
