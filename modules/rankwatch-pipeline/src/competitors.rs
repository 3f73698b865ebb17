use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use rankwatch_common::{CompetitorEntry, InsightError, PageMetadata};
use serp_client::Locale;

use crate::metadata::extract_page_metadata;
use crate::traits::{PageFetcher, WebSearcher};

pub const DEFAULT_COMPETITOR_LIMIT: usize = 5;

/// Page fetches in flight while enriching one result list.
const METADATA_CONCURRENCY: usize = 4;

/// Extra results requested to cover linkless hits dropped before truncation.
const SEARCH_SURPLUS: usize = 2;

/// Finds the pages ranking for a keyword and scrapes their title and
/// description. Never fails: search or fetch problems shrink the output.
pub struct CompetitorFetcher {
    searcher: Arc<dyn WebSearcher>,
    pages: Arc<dyn PageFetcher>,
    locale: Locale,
}

impl CompetitorFetcher {
    pub fn new(searcher: Arc<dyn WebSearcher>, pages: Arc<dyn PageFetcher>, locale: Locale) -> Self {
        Self {
            searcher,
            pages,
            locale,
        }
    }

    /// Up to `limit` competitors in search rank order, ranks 1..=N.
    ///
    /// A blank keyword returns an empty list without calling the search API.
    pub async fn top_competitors(&self, keyword: &str, limit: usize) -> Vec<CompetitorEntry> {
        let keyword = keyword.trim();
        if keyword.is_empty() || limit == 0 {
            debug!("No keyword for competitor search, skipping");
            return Vec::new();
        }

        let hits = match self
            .searcher
            .search(keyword, &self.locale, limit + SEARCH_SURPLUS)
            .await {
            Ok(hits) => hits,
            Err(e) => {
                let err = InsightError::SourceUnavailable(format!("competitor search: {e:#}"));
                warn!(keyword, error = %err, "Continuing without competitors");
                return Vec::new();
            }
        };

        let hits: Vec<_> = hits
            .into_iter()
            .filter(|h| !h.url.trim().is_empty())
            .take(limit)
            .collect();

        let competitors: Vec<CompetitorEntry> = stream::iter(hits.into_iter().enumerate())
            .map(|(idx, hit)| async move {
                let meta = self.page_metadata(&hit.url).await;
                let title = match hit.title.trim() {
                    "" => meta.title,
                    t => t.to_string(),
                };
                CompetitorEntry {
                    rank: idx as u32 + 1,
                    title,
                    description: meta.description,
                    url: hit.url,
                }
            })
            .buffered(METADATA_CONCURRENCY)
            .collect()
            .await;

        info!(keyword, count = competitors.len(), "Competitors collected");
        competitors
    }

    /// Title and description of one page. Unreachable or unparseable pages
    /// yield empty strings.
    pub async fn page_metadata(&self, url: &str) -> PageMetadata {
        match self.pages.fetch_html(url).await {
            Ok(html) => extract_page_metadata(&html),
            Err(e) => {
                debug!(url, error = %e, "Competitor page fetch failed");
                PageMetadata::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPageFetcher, MockSearcher};
    use crate::traits::SearchHit;

    fn fetcher(searcher: Arc<MockSearcher>, pages: MockPageFetcher) -> CompetitorFetcher {
        CompetitorFetcher::new(searcher, Arc::new(pages), Locale::new("ja", "jp"))
    }

    #[tokio::test]
    async fn blank_keyword_never_searches() {
        let searcher = Arc::new(MockSearcher::new(vec![SearchHit::new("https://a.com", "A")]));
        let competitors = fetcher(searcher.clone(), MockPageFetcher::new())
            .top_competitors("   ", 5)
            .await;
        assert!(competitors.is_empty());
        assert_eq!(searcher.calls(), 0);
    }

    #[tokio::test]
    async fn keeps_rank_order_and_truncates() {
        let hits = (1..=7)
            .map(|i| SearchHit::new(format!("https://site{i}.com/"), format!("Site {i}")))
            .collect();
        let searcher = Arc::new(MockSearcher::new(hits));
        let pages = MockPageFetcher::new().on_page(
            "https://site2.com/",
            r#"<head><meta name="description" content="Second"></head>"#,
        );

        let competitors = fetcher(searcher.clone(), pages).top_competitors("shoes", 5).await;
        assert_eq!(competitors.len(), 5);
        let ranks: Vec<u32> = competitors.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert_eq!(competitors[0].url, "https://site1.com/");
        assert_eq!(competitors[1].description, "Second");
        assert_eq!(competitors[0].description, "");
        assert_eq!(searcher.keywords(), vec!["shoes"]);
    }

    #[tokio::test]
    async fn results_without_links_are_skipped() {
        let searcher = Arc::new(MockSearcher::new(vec![
            SearchHit::new("", "No link"),
            SearchHit::new("https://b.com/", "B"),
        ]));
        let competitors = fetcher(searcher, MockPageFetcher::new()).top_competitors("x", 5).await;
        assert_eq!(competitors.len(), 1);
        assert_eq!(competitors[0].rank, 1);
        assert_eq!(competitors[0].title, "B");
    }

    #[tokio::test]
    async fn linkless_result_does_not_shrink_full_list() {
        let mut hits = vec![SearchHit::new("", "Ad without link")];
        hits.extend(
            (1..=6).map(|i| SearchHit::new(format!("https://site{i}.com/"), format!("Site {i}"))),
        );
        let searcher = Arc::new(MockSearcher::new(hits));

        let competitors = fetcher(searcher.clone(), MockPageFetcher::new())
            .top_competitors("shoes", 5)
            .await;
        assert_eq!(searcher.requested(), vec![5 + SEARCH_SURPLUS]);
        assert_eq!(competitors.len(), 5);
        assert_eq!(competitors[0].url, "https://site1.com/");
        assert_eq!(competitors[4].url, "https://site5.com/");
    }

    #[tokio::test]
    async fn missing_result_title_falls_back_to_page_title() {
        let searcher = Arc::new(MockSearcher::new(vec![SearchHit::new("https://c.com/", "")]));
        let pages = MockPageFetcher::new().on_page("https://c.com/", "<title>From page</title>");
        let competitors = fetcher(searcher, pages).top_competitors("x", 5).await;
        assert_eq!(competitors[0].title, "From page");
    }

    #[tokio::test]
    async fn search_failure_yields_empty_list() {
        let searcher = Arc::new(MockSearcher::failing());
        let competitors = fetcher(searcher.clone(), MockPageFetcher::new())
            .top_competitors("shoes", 5)
            .await;
        assert!(competitors.is_empty());
        assert_eq!(searcher.calls(), 1);
    }

    #[tokio::test]
    async fn page_metadata_never_errors() {
        let meta = fetcher(Arc::new(MockSearcher::new(vec![])), MockPageFetcher::new())
            .page_metadata("https://unreachable.example/")
            .await;
        assert_eq!(meta, PageMetadata::default());
    }
}
