//! Named OpenAI-compatible endpoints
//!
//! Presets only describe where to connect and where the key comes from.
//! The caller looks the key up (environment, flags) and hands it in, so
//! nothing here reads process state.

use super::ProviderConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPreset {
    Ollama,
    LmStudio,
    DeepSeek,
    Qwen,
    Groq,
    Together,
    OpenAI,
    /// Custom `BASE_URL`/`API_KEY`, defaulting to a local Ollama
    Default,
}

impl ProviderPreset {
    /// Resolve a provider name; unknown or empty names map to `Default`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ollama" => ProviderPreset::Ollama,
            "lmstudio" => ProviderPreset::LmStudio,
            "deepseek" => ProviderPreset::DeepSeek,
            "qwen" => ProviderPreset::Qwen,
            "groq" => ProviderPreset::Groq,
            "together" => ProviderPreset::Together,
            "openai" => ProviderPreset::OpenAI,
            _ => ProviderPreset::Default,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderPreset::Ollama => "ollama",
            ProviderPreset::LmStudio => "lmstudio",
            ProviderPreset::DeepSeek => "deepseek",
            ProviderPreset::Qwen => "qwen",
            ProviderPreset::Groq => "groq",
            ProviderPreset::Together => "together",
            ProviderPreset::OpenAI => "openai",
            ProviderPreset::Default => "default",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            ProviderPreset::Ollama | ProviderPreset::Default => "http://localhost:11434/v1",
            ProviderPreset::LmStudio => "http://localhost:1234/v1",
            ProviderPreset::DeepSeek => "https://api.deepseek.com/v1",
            ProviderPreset::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            ProviderPreset::Groq => "https://api.groq.com/openai/v1",
            ProviderPreset::Together => "https://api.together.xyz/v1",
            ProviderPreset::OpenAI => "https://api.openai.com/v1",
        }
    }

    /// Environment variable holding the provider-specific key, if any.
    ///
    /// Presets without one take the generic `API_KEY`.
    pub fn key_env(&self) -> &'static str {
        match self {
            ProviderPreset::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderPreset::Qwen => "DASHSCOPE_API_KEY",
            ProviderPreset::Groq => "GROQ_API_KEY",
            ProviderPreset::Together => "TOGETHER_API_KEY",
            ProviderPreset::OpenAI => "OPENAI_API_KEY",
            ProviderPreset::Ollama | ProviderPreset::LmStudio | ProviderPreset::Default => "API_KEY",
        }
    }

    /// Placeholder key for local servers that ignore authentication
    pub fn fallback_key(&self) -> Option<&'static str> {
        match self {
            ProviderPreset::Ollama => Some("ollama"),
            ProviderPreset::LmStudio => Some("lmstudio"),
            ProviderPreset::Default => Some("key"),
            _ => None,
        }
    }

    fn is_local(&self) -> bool {
        self.fallback_key().is_some()
    }

    /// Build a provider config from this preset.
    ///
    /// `base_url` overrides the preset endpoint; `api_key` is whatever the
    /// caller found under [`key_env`](Self::key_env).
    pub fn config(
        &self,
        base_url: Option<&str>,
        api_key: Option<&str>,
        model: &str,
    ) -> Result<ProviderConfig> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .or(self.fallback_key())
            .ok_or_else(|| {
                Error::config_invalid(format!(
                    "Missing API key for provider '{}'. Set API_KEY or {}.",
                    self.name(),
                    self.key_env()
                ))
                .with_operation("preset::config")
                .with_context("provider", self.name())
            })?;

        let base_url = base_url
            .filter(|url| !url.is_empty())
            .unwrap_or(self.base_url());

        Ok(ProviderConfig::new(self.name(), base_url, model)
            .with_api_key(api_key)
            .with_timeout(if self.is_local() { 300 } else { 120 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_from_name() {
        assert_eq!(ProviderPreset::from_name("Groq"), ProviderPreset::Groq);
        assert_eq!(ProviderPreset::from_name(" lmstudio "), ProviderPreset::LmStudio);
        assert_eq!(ProviderPreset::from_name(""), ProviderPreset::Default);
        assert_eq!(ProviderPreset::from_name("mystery"), ProviderPreset::Default);
    }

    #[test]
    fn test_local_preset_uses_placeholder_key() {
        let config = ProviderPreset::Ollama.config(None, None, "qwen2.5-coder:7b").unwrap();
        assert_eq!(config.name, "ollama");
        assert_eq!(config.api_key.as_deref(), Some("ollama"));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(config.default_model.as_deref(), Some("qwen2.5-coder:7b"));
        assert_eq!(config.timeout_secs, Some(300));
    }

    #[test]
    fn test_hosted_preset_requires_key() {
        let err = ProviderPreset::DeepSeek
            .config(None, None, "deepseek-chat")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("DEEPSEEK_API_KEY"));

        let err = ProviderPreset::OpenAI.config(None, Some(""), "gpt-4o").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_base_url_override() {
        let config = ProviderPreset::Groq
            .config(Some("http://proxy:8080/v1"), Some("gsk-1"), "llama")
            .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://proxy:8080/v1"));
        assert_eq!(config.api_key.as_deref(), Some("gsk-1"));
        assert_eq!(config.timeout_secs, Some(120));
    }
}
