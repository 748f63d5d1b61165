//! Engine configuration.
//!
//! Settings are read from `<workspace>/.forge/settings.json` and then
//! overridden by environment variables:
//!
//! | Variable | Setting |
//! |---|---|
//! | `FORGE_LLM_PROVIDER` | `provider` (`openai` or `anthropic`) |
//! | `FORGE_LLM_MODEL` | `model` |
//! | `FORGE_LLM_TIMEOUT_SECS` | `timeoutSecs` |
//! | `FORGE_LLM_MAX_ATTEMPTS` | `maxAttempts` |
//!
//! API keys are never stored in settings; they come from `OPENAI_API_KEY`
//! and `ANTHROPIC_API_KEY`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-5-mini",
            Self::Anthropic => "claude-sonnet-4.5",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(GatewayError::InvalidConfig(format!("unknown provider '{}'", other))),
        }
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForgeConfig {
    /// Preferred provider; when unset the first provider with a key wins
    pub provider: Option<LlmProvider>,
    /// Model override; defaults per provider
    pub model: Option<String>,
    /// Per-request timeout for model calls
    pub timeout_secs: u64,
    /// Total attempts per model call. 1 disables retry.
    pub max_attempts: u32,
    /// Completion token limit
    pub max_tokens: u32,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            timeout_secs: 120,
            max_attempts: 1,
            max_tokens: 4096,
        }
    }
}

impl ForgeConfig {
    /// Location of the settings file inside a workspace
    pub fn settings_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".forge").join("settings.json")
    }

    /// Load settings from a workspace, applying process environment overrides
    pub fn load(workspace_root: &Path) -> GatewayResult<Self> {
        Self::from_file(&Self::settings_path(workspace_root))?
            .with_overrides(|key| std::env::var(key).ok())
    }

    /// Read a settings file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> GatewayResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| GatewayError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// Apply `FORGE_LLM_*` overrides from a variable lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> GatewayResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = var("FORGE_LLM_PROVIDER") {
            self.provider = Some(provider.parse()?);
        }
        if let Some(model) = var("FORGE_LLM_MODEL") {
            self.model = Some(model);
        }
        if let Some(timeout) = var("FORGE_LLM_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("FORGE_LLM_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(attempts) = var("FORGE_LLM_MAX_ATTEMPTS") {
            self.max_attempts = parse_number("FORGE_LLM_MAX_ATTEMPTS", &attempts)?;
        }

        if self.max_attempts == 0 {
            return Err(GatewayError::InvalidConfig("maxAttempts must be at least 1".to_string()));
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> GatewayResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GatewayError::InvalidConfig(format!("{} must be a number, got '{}'", key, value)))
}
