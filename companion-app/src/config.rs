use anyhow::{bail, Context, Result};
use companion_core::SessionConfig;
use companion_providers::gemini::DEFAULT_GEMINI_MODEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "companion.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenaiCompatible {
        base_url: String,
        #[serde(default)]
        require_api_key: bool,
    },
}

impl LlmProvider {
    /// Environment variable holding the credential for this provider.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "GEMINI_API_KEY",
            LlmProvider::OpenaiCompatible { .. } => "OPENAI_API_KEY",
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            LlmProvider::Gemini => "Google Gemini".to_string(),
            LlmProvider::OpenaiCompatible { base_url, .. } => {
                format!("OpenAI-compatible ({})", base_url)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Json {
        path: PathBuf,
    },
    Sqlite {
        path: PathBuf,
    },
    Rest {
        base_url: String,
        #[serde(default = "default_table")]
        table: String,
    },
}

fn default_table() -> String {
    "tasks".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub user_id: String,
    pub provider: LlmProvider,
    pub model: String,
    pub store: StoreBackend,
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "local-user".to_string(),
            provider: LlmProvider::default(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            store: StoreBackend::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Defaults when no file exists at `path`.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if Self::exists(path) {
            Self::load(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply `COMPANION_MODEL` / `COMPANION_USER` as found through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model) = lookup("COMPANION_MODEL").filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        if let Some(user) = lookup("COMPANION_USER").filter(|v| !v.trim().is_empty()) {
            self.user_id = user;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            bail!("user_id cannot be empty");
        }

        if self.model.trim().is_empty() {
            bail!("model cannot be empty");
        }

        if let LlmProvider::OpenaiCompatible { base_url, .. } = &self.provider {
            if base_url.trim().is_empty() {
                bail!("provider base_url cannot be empty");
            }
        }

        match &self.store {
            StoreBackend::Json { path } | StoreBackend::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    bail!("store path cannot be empty");
                }
            }
            StoreBackend::Rest { base_url, table } => {
                if base_url.trim().is_empty() || table.trim().is_empty() {
                    bail!("store base_url and table cannot be empty");
                }
            }
            StoreBackend::Memory => {}
        }

        self.session
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid session settings: {}", e))
    }
}
