use std::fmt::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};

use ai_client::clip_for_prompt;
use rankwatch_common::{CompetitorEntry, InsightError, MergedRecord};

use crate::metadata::extract_self_description;
use crate::traits::{PageFetcher, TextGenerator};

pub const SYSTEM_INSTRUCTION: &str = "You are an SEO expert. You give concrete, actionable advice on page titles and meta descriptions, grounded in how competing pages present themselves. Reply in the language the pages are written in.";

/// Returned in place of a recommendation when generation fails.
pub const RECOMMENDATION_UNAVAILABLE: &str = "could not obtain a recommendation";

/// Stands in for a field that was fetched but came back empty.
pub const UNKNOWN_PLACEHOLDER: &str = "(unknown)";

/// Stands in for an empty table or list.
pub const NO_DATA_MARKER: &str = "(no data)";

const MAX_FIELD_BYTES: usize = 500;
const MAX_CONTEXT_ROWS: usize = 20;

pub struct RecommendationComposer {
    generator: Arc<dyn TextGenerator>,
    pages: Option<Arc<dyn PageFetcher>>,
}

impl RecommendationComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            pages: None,
        }
    }

    /// Enrich the prompt with the target page's own description.
    pub fn with_page_fetcher(mut self, pages: Arc<dyn PageFetcher>) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Ask the generator for improvement advice on the target page. Never
    /// fails; generation problems return [`RECOMMENDATION_UNAVAILABLE`].
    pub async fn compose(
        &self,
        target_page_key: &str,
        competitors: &[CompetitorEntry],
        metrics_context: &[MergedRecord],
    ) -> String {
        let self_description = self.self_description(target_page_key).await;
        let prompt = build_prompt(target_page_key, &self_description, competitors, metrics_context);
        debug!(target = target_page_key, prompt_len = prompt.len(), "Requesting recommendation");

        let err = match self.generator.complete(SYSTEM_INSTRUCTION, &prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(target = target_page_key, "Recommendation generated");
                return text.trim().to_string();
            }
            Ok(_) => InsightError::GenerationFailed("empty reply".to_string()),
            Err(e) => InsightError::GenerationFailed(format!("{e:#}")),
        };
        warn!(target = target_page_key, error = %err, "Using fallback recommendation text");
        RECOMMENDATION_UNAVAILABLE.to_string()
    }

    async fn self_description(&self, target_page_key: &str) -> String {
        let Some(pages) = &self.pages else {
            return String::new();
        };
        if !target_page_key.starts_with("http") {
            return String::new();
        }
        match pages.fetch_html(target_page_key).await {
            Ok(html) => extract_self_description(&html),
            Err(e) => {
                debug!(url = target_page_key, error = %e, "Target page fetch failed");
                String::new()
            }
        }
    }
}

/// The user prompt sent to the generator.
pub fn build_prompt(
    target_page_key: &str,
    self_description: &str,
    competitors: &[CompetitorEntry],
    metrics_context: &[MergedRecord],
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "The page {target_page_key} ranks poorly in search results. Below are the titles and meta descriptions of the pages ranking above it, followed by the site's search metrics."
    );
    let _ = writeln!(
        prompt,
        "Compare them and propose concrete improvements to the title and meta description of {target_page_key}, with example rewrites.\n"
    );

    let _ = writeln!(prompt, "## Target page");
    let _ = writeln!(prompt, "URL: {target_page_key}");
    let _ = writeln!(prompt, "Current description: {}\n", or_unknown(self_description));

    let _ = writeln!(prompt, "## Competing pages");
    if competitors.is_empty() {
        let _ = writeln!(prompt, "{NO_DATA_MARKER}");
    }
    for c in competitors {
        let _ = writeln!(prompt, "{}. Title: {}", c.rank, or_unknown(&c.title));
        let _ = writeln!(prompt, "   Meta description: {}", or_unknown(&c.description));
        let _ = writeln!(prompt, "   URL: {}", or_unknown(&c.url));
    }

    let _ = writeln!(prompt, "\n## Search metrics");
    prompt.push_str(&render_metrics_table(metrics_context));
    prompt
}

/// Markdown table of the metrics context, capped at a fixed row count.
pub fn render_metrics_table(records: &[MergedRecord]) -> String {
    if records.is_empty() {
        return format!("{NO_DATA_MARKER}\n");
    }

    let mut table = String::from(
        "| Page | Clicks | Impressions | CTR (%) | Avg. position | Conversions |\n|---|---|---|---|---|---|\n",
    );
    for r in records.iter().take(MAX_CONTEXT_ROWS) {
        let _ = writeln!(
            table,
            "| {} | {} | {} | {:.2} | {:.2} | {} |",
            r.page_key, r.clicks, r.impressions, r.ctr, r.avg_position, r.conversions
        );
    }
    if records.len() > MAX_CONTEXT_ROWS {
        let _ = writeln!(table, "({} more pages omitted)", records.len() - MAX_CONTEXT_ROWS);
    }
    table
}

fn or_unknown(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        UNKNOWN_PLACEHOLDER.to_string()
    } else {
        clip_for_prompt(value, MAX_FIELD_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockGenerator, MockPageFetcher};
    use rankwatch_common::MetricRow;

    fn competitor(rank: u32, title: &str, description: &str) -> CompetitorEntry {
        CompetitorEntry {
            rank,
            title: title.to_string(),
            description: description.to_string(),
            url: format!("https://rival{rank}.com/"),
        }
    }

    #[test]
    fn empty_fields_render_as_unknown() {
        let prompt = build_prompt(
            "https://example.com/a",
            "",
            &[competitor(1, "", "")],
            &[],
        );
        assert!(prompt.contains("1. Title: (unknown)"));
        assert!(prompt.contains("Meta description: (unknown)"));
        assert!(prompt.contains("Current description: (unknown)"));
    }

    #[test]
    fn empty_metrics_render_no_data_marker() {
        let prompt = build_prompt("https://example.com/a", "x", &[competitor(1, "T", "D")], &[]);
        assert!(prompt.ends_with("## Search metrics\n(no data)\n"));
    }

    #[test]
    fn metrics_table_lists_records() {
        let mut row = MetricRow::new("https://example.com/a");
        row.clicks = 10;
        row.impressions = 100;
        row.ctr = 10.0;
        row.avg_position = 5.0;
        let table = render_metrics_table(&[row]);
        assert!(table.contains("| https://example.com/a | 10 | 100 | 10.00 | 5.00 | 0 |"));
    }

    #[test]
    fn metrics_table_is_capped() {
        let rows: Vec<_> = (0..25).map(|i| MetricRow::new(format!("/p{i}"))).collect();
        let table = render_metrics_table(&rows);
        assert!(table.contains("(5 more pages omitted)"));
        assert!(!table.contains("/p20 "));
    }

    #[tokio::test]
    async fn generator_reply_is_trimmed() {
        let generator = Arc::new(MockGenerator::replying("  Rewrite the title.\n"));
        let composer = RecommendationComposer::new(generator.clone());
        let text = composer
            .compose("https://example.com/a", &[competitor(1, "T", "D")], &[])
            .await;
        assert_eq!(text, "Rewrite the title.");
        assert_eq!(generator.calls(), 1);
        assert_eq!(generator.system_instructions()[0], SYSTEM_INSTRUCTION);
    }

    #[tokio::test]
    async fn generation_failure_returns_fallback() {
        let composer = RecommendationComposer::new(Arc::new(MockGenerator::failing()));
        let text = composer.compose("https://example.com/a", &[], &[]).await;
        assert_eq!(text, RECOMMENDATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn blank_reply_returns_fallback() {
        let composer = RecommendationComposer::new(Arc::new(MockGenerator::replying("   ")));
        let text = composer.compose("https://example.com/a", &[], &[]).await;
        assert_eq!(text, RECOMMENDATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn target_description_is_scraped_when_available() {
        let generator = Arc::new(MockGenerator::replying("ok"));
        let pages = MockPageFetcher::new().on_page(
            "https://example.com/a",
            r#"<head><meta property="og:description" content="Hand-made boots"></head>"#,
        );
        let composer =
            RecommendationComposer::new(generator.clone()).with_page_fetcher(Arc::new(pages));
        composer
            .compose("https://example.com/a", &[competitor(1, "T", "D")], &[])
            .await;
        assert!(generator.prompts()[0].contains("Current description: Hand-made boots"));
    }

    #[tokio::test]
    async fn target_fetch_failure_leaves_description_unknown() {
        let generator = Arc::new(MockGenerator::replying("ok"));
        let composer = RecommendationComposer::new(generator.clone())
            .with_page_fetcher(Arc::new(MockPageFetcher::new()));
        composer
            .compose("https://example.com/a", &[competitor(1, "T", "D")], &[])
            .await;
        assert!(generator.prompts()[0].contains("Current description: (unknown)"));
    }
}
