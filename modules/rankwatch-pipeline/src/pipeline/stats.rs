use super::state::Stage;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Every stage entered, in order, ending with `Done` on a completed run.
    pub stages: Vec<Stage>,
    pub pages_fetched: u32,
    pub search_terms: u32,
    pub previous_pages: u32,
    pub conversion_lookups: u32,
    pub conversion_hits: u32,
    pub competitors_found: u32,
    pub recommendation_attempted: bool,
    pub recommendation_generated: bool,
    pub rank_drops: u32,
}

impl RunStats {
    pub fn visited(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Insight Run Complete ===")?;
        writeln!(f, "Pages fetched:      {}", self.pages_fetched)?;
        writeln!(f, "Search terms:       {}", self.search_terms)?;
        writeln!(f, "Previous pages:     {}", self.previous_pages)?;
        writeln!(
            f,
            "Conversion lookups: {} ({} with data)",
            self.conversion_lookups, self.conversion_hits
        )?;
        writeln!(f, "Rank drops:         {}", self.rank_drops)?;
        writeln!(f, "Competitors found:  {}", self.competitors_found)?;
        let recommendation = match (self.recommendation_attempted, self.recommendation_generated) {
            (false, _) => "skipped",
            (true, true) => "generated",
            (true, false) => "fallback",
        };
        writeln!(f, "Recommendation:     {recommendation}")?;
        let trail: Vec<String> = self.stages.iter().map(|s| s.to_string()).collect();
        writeln!(f, "Stages:             {}", trail.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_stage_trail() {
        let stats = RunStats {
            stages: vec![Stage::Start, Stage::FetchMetrics, Stage::FallbackNoMetrics],
            ..RunStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("START -> FETCH_METRICS -> FALLBACK_NO_METRICS"));
        assert!(text.contains("Recommendation:     skipped"));
    }
}
