use std::env;
use std::time::Duration;

use tracing::info;

/// Application configuration loaded from environment variables.
///
/// Every credential is optional: a missing one disables the matching
/// collaborator and the pipeline degrades instead of refusing to start.
#[derive(Debug, Clone)]
pub struct Config {
    // Google (OAuth access token is issued and refreshed elsewhere)
    pub google_access_token: Option<String>,
    pub ga_property_id: Option<String>,

    // Competitor search
    pub serpapi_key: Option<String>,
    pub serp_language: String,
    pub serp_country: String,

    // Generative text
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub generation_timeout: Duration,

    // Pipeline
    pub http_timeout: Duration,
    pub competitor_limit: usize,
    pub conversion_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            google_access_token: optional_env("GOOGLE_ACCESS_TOKEN"),
            ga_property_id: optional_env("GA_PROPERTY_ID"),
            serpapi_key: optional_env("SERPAPI_KEY").or_else(|| optional_env("SERPAPI_API_KEY")),
            serp_language: env::var("SERP_LANGUAGE").unwrap_or_else(|_| "ja".to_string()),
            serp_country: env::var("SERP_COUNTRY").unwrap_or_else(|_| "jp".to_string()),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            generation_timeout: Duration::from_secs(parsed_env("GENERATION_TIMEOUT_SECS", 60)),
            http_timeout: Duration::from_secs(parsed_env("HTTP_TIMEOUT_SECS", 10)),
            competitor_limit: parsed_env("COMPETITOR_LIMIT", 5),
            conversion_concurrency: parsed_env::<usize>("CONVERSION_CONCURRENCY", 4).max(1),
        }
    }

    /// Log which credentials are configured without revealing them.
    pub fn log_redacted(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let n = v.chars().take(5).map(char::len_utf8).sum::<usize>();
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        info!("Config loaded:");
        info!("  GOOGLE_ACCESS_TOKEN: {}", preview(&self.google_access_token));
        info!(
            "  GA_PROPERTY_ID: {}",
            self.ga_property_id.as_deref().unwrap_or("<not set>")
        );
        info!("  SERPAPI_KEY: {}", preview(&self.serpapi_key));
        info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        info!(
            "  OPENAI_MODEL: {} (timeout {}s)",
            self.openai_model,
            self.generation_timeout.as_secs()
        );
        info!(
            "  SERP locale: hl={} gl={}",
            self.serp_language, self.serp_country
        );
        info!(
            timeout_secs = self.http_timeout.as_secs(),
            competitor_limit = self.competitor_limit,
            conversion_concurrency = self.conversion_concurrency,
            "  Pipeline settings"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
