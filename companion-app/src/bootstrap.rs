//! Turns a validated [`Config`] into live collaborators.

use crate::config::{Config, LlmProvider, StoreBackend};
use anyhow::{Context, Result};
use companion_providers::{GeminiProvider, LanguageModel, OpenAICompatibleProvider};
use companion_tasks::{MemoryTaskStore, RestTaskStore, SqliteTaskStore, TaskStore};
use std::sync::Arc;

pub const STORE_KEY_VAR: &str = "COMPANION_STORE_KEY";

/// Non-blank value of an environment variable.
pub fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub async fn build_store(
    backend: &StoreBackend,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn TaskStore>> {
    let store: Arc<dyn TaskStore> = match backend {
        StoreBackend::Memory => Arc::new(MemoryTaskStore::new()),
        StoreBackend::Json { path } => {
            let store = MemoryTaskStore::with_state_file(path);
            store
                .restore()
                .await
                .with_context(|| format!("Failed to restore tasks from {}", path.display()))?;
            Arc::new(store)
        }
        StoreBackend::Sqlite { path } => Arc::new(
            SqliteTaskStore::new(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        StoreBackend::Rest { base_url, table } => {
            let api_key = lookup(STORE_KEY_VAR);
            if api_key.is_none() {
                tracing::warn!("{} not set; store requests are anonymous", STORE_KEY_VAR);
            }
            Arc::new(RestTaskStore::new(base_url.clone(), api_key).with_table(table.clone()))
        }
    };

    tracing::info!("Task store: {}", store.name());
    Ok(store)
}

/// Build the model client. A missing credential is not an error here; the
/// client reports it on its first call.
pub fn build_model(
    config: &Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Arc<dyn LanguageModel> {
    let key_var = config.provider.api_key_var();
    let api_key = lookup(key_var);
    tracing::info!(
        "Model: {} / {} (api key {})",
        config.provider.display_name(),
        config.model,
        if api_key.is_some() { "present" } else { "missing" }
    );

    match &config.provider {
        LlmProvider::Gemini => Arc::new(GeminiProvider::new(api_key, config.model.clone())),
        LlmProvider::OpenaiCompatible {
            base_url,
            require_api_key,
        } => {
            let provider =
                OpenAICompatibleProvider::new(base_url.clone(), api_key, config.model.clone());
            if *require_api_key {
                Arc::new(provider.requiring_api_key())
            } else {
                Arc::new(provider)
            }
        }
    }
}
