use crate::traits::*;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Any server speaking the `/chat/completions` dialect. The prompt is sent as
/// a single user message.
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    require_key: bool,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            api_key,
            model,
            require_key: false,
        }
    }

    /// Hosted endpoints reject anonymous calls; fail early instead.
    pub fn requiring_api_key(mut self) -> Self {
        self.require_key = true;
        self
    }
}

fn parse_content(json: &serde_json::Value) -> Result<String, ProviderError> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

    Ok(choice["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}

#[async_trait]
impl LanguageModel for OpenAICompatibleProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        if self.require_key {
            require_api_key(&self.api_key, "OpenAI-compatible")?;
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        tracing::debug!("llm url={} model={}", url, self.model);

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut request = self.client.post(&url).json(&body);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "{}: {}",
                status,
                truncate_body(&text)
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_content(&json)
    }

    fn name(&self) -> &str {
        "OpenAI Compatible"
    }
}
