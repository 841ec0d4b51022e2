use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
}

impl ProviderError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::Configuration(_))
    }
}

/// Opaque text-completion service: one prompt in, one completion out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

pub(crate) fn require_api_key<'a>(
    api_key: &'a Option<String>,
    provider: &str,
) -> Result<&'a str, ProviderError> {
    match api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(ProviderError::Configuration(format!(
            "{} API key is not set",
            provider
        ))),
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > 800 {
        let head: String = body.chars().take(800).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}
