pub mod error;
pub mod types;

pub use error::{Result, SerpError};
pub use types::{Locale, OrganicResult, SearchResponse};

use std::time::Duration;

const BASE_URL: &str = "https://serpapi.com/search.json";

pub struct SerpApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Run a Google search and return organic results in ranking order.
    pub async fn google_search(
        &self,
        query: &str,
        locale: &Locale,
        num: usize,
    ) -> Result<Vec<OrganicResult>> {
        tracing::info!(query, num, hl = %locale.language, gl = %locale.country, "SerpAPI search");

        let num = num.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("hl", locale.language.as_str()),
                ("gl", locale.country.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SerpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = resp.text().await?;
        let data: SearchResponse = serde_json::from_str(&text)?;
        if let Some(error) = data.error {
            return Err(SerpError::Search(error));
        }

        tracing::info!(query, count = data.organic_results.len(), "SerpAPI search complete");
        Ok(data.organic_results)
    }
}
