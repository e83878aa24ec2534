use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use super::types::{ChatRequest, CompletionResponse, Message};
use crate::config::LlmSettings;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<String>;

    /// `model == "default"` means whatever model the client was configured with.
    async fn chat_with_history(&self, messages: Vec<Message>, model: &str) -> Result<String>;
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
///
/// Credentials are read lazily: a client built from empty settings is valid
/// and only fails when the first request is made.
pub struct HttpLlmClient {
    client: Client,
    name: String,
    settings: LlmSettings,
}

impl HttpLlmClient {
    pub fn new(name: impl Into<String>, settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            name: name.into(),
            settings,
        })
    }

    fn endpoint(&self) -> Result<String> {
        let base_url = self
            .settings
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("{}: base URL is not configured", self.name))?;
        Ok(format!("{}/chat/completions", base_url.trim_end_matches('/')))
    }

    fn model_for<'a>(&'a self, requested: &'a str) -> Result<&'a str> {
        if requested != "default" && !requested.is_empty() {
            return Ok(requested);
        }
        self.settings
            .model_name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("{}: model name is not configured", self.name))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(&self, mut request: ChatRequest) -> Result<String> {
        let url = self.endpoint()?;
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("{}: API key is not configured", self.name))?;

        request.model = self.model_for(&request.model)?.to_string();
        if request.temperature.is_none() {
            request.temperature = Some(self.settings.temperature);
        }

        debug!("Sending chat request to {}: {:?}", self.name, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            error!("{} API error {}: {}", self.name, status, error_text);
            anyhow::bail!("{} API error: {} - {}", self.name, status, error_text);
        }

        let completion: CompletionResponse = response.json().await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| anyhow::anyhow!("No response from {}", self.name))?;

        debug!("{} response: {}", self.name, content);
        Ok(content)
    }

    async fn chat_with_history(&self, messages: Vec<Message>, model: &str) -> Result<String> {
        let request = ChatRequest::new(model, messages).with_temperature(self.settings.temperature);
        self.chat(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(base_url: Option<&str>) -> LlmSettings {
        LlmSettings {
            api_key: None,
            base_url: base_url.map(String::from),
            model_name: Some("qwen-plus".to_string()),
            temperature: 0.3,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = HttpLlmClient::new("default_llm", settings(Some("http://localhost:1234/v1/"))).unwrap();
        assert_eq!(
            client.endpoint().unwrap(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_default_model_is_substituted() {
        let client = HttpLlmClient::new("default_llm", settings(None)).unwrap();
        assert_eq!(client.model_for("default").unwrap(), "qwen-plus");
        assert_eq!(client.model_for("qwen-max").unwrap(), "qwen-max");
    }

    #[tokio::test]
    async fn test_missing_settings_fail_at_call_time() {
        let client = HttpLlmClient::new("default_llm", settings(None)).unwrap();
        let err = client
            .chat_with_history(vec![Message::user("hi")], "default")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("base URL is not configured"));
    }
}
