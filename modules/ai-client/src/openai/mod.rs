mod client;
pub(crate) mod types;

use std::time::Duration;

use anyhow::{anyhow, Result};

use client::OpenAiClient;

/// Token budget for a single completion.
const MAX_OUTPUT_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.7;

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout. A request exceeding it fails like any other error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, self.timeout);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    fn chat_request(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> types::ChatRequest {
        let request = types::ChatRequest::new(&self.model)
            .message(types::WireMessage::system(system))
            .message(types::WireMessage::user(user));

        if types::uses_max_completion_tokens(&self.model) {
            request.max_completion_tokens(MAX_OUTPUT_TOKENS)
        } else {
            request
                .max_tokens(MAX_OUTPUT_TOKENS)
                .temperature(TEMPERATURE)
        }
    }

    /// Single-shot chat completion: one system instruction, one user prompt.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = self.chat_request(system, user);
        let response = self.client().chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("No response from OpenAI"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o");
        assert_eq!(ai.model, "gpt-4o");
        assert_eq!(ai.api_key, "sk-test");
        assert!(ai.timeout.is_none());
    }

    #[test]
    fn test_openai_with_base_url() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, Some("https://custom.api.com".to_string()));
    }

    #[test]
    fn test_openai_with_timeout() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_timeout(Duration::from_secs(8));
        assert_eq!(ai.timeout, Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_chat_request_is_one_system_and_one_user_message() {
        let request = OpenAi::new("sk-test", "gpt-4o").chat_request("sys", "hi");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, types::Role::System);
        assert_eq!(request.messages[1].role, types::Role::User);
        assert_eq!(request.max_tokens, Some(MAX_OUTPUT_TOKENS));
        assert_eq!(request.temperature, Some(TEMPERATURE));
    }

    #[test]
    fn test_reasoning_model_request_has_no_temperature() {
        let request = OpenAi::new("sk-test", "o3-mini").chat_request("sys", "hi");
        assert_eq!(request.max_completion_tokens, Some(MAX_OUTPUT_TOKENS));
        assert!(request.max_tokens.is_none());
        assert!(request.temperature.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let ai = OpenAi::new("sk-test", "gpt-4o")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        assert!(ai.chat_completion("sys", "hi").await.is_err());
    }
}
