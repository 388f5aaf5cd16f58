use anyhow::{Context, Result};

/// Configuration for an OpenAI-compatible chat completions endpoint.
///
/// `host` is the full base URL of the inference endpoint, e.g.
/// `https://models.github.ai/inference` or `https://api.openai.com/v1`.
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    /// Sent as an `api-version` query parameter when present; some gateways
    /// (GitHub Models among them) require it.
    pub api_version: Option<String>,
}

impl OpenAiProviderConfig {
    pub fn new<H, K, M>(host: H, api_key: K, model: M) -> Self
    where
        H: Into<String>,
        K: Into<String>,
        M: Into<String>,
    {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            model: model.into(),
            api_version: None,
        }
    }

    pub fn with_api_version<S: Into<String>>(mut self, api_version: S) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Build a config for the given model from the process environment
    pub fn from_env<M: Into<String>>(model: M) -> Result<Self> {
        let host = std::env::var("TANDEM_HOST")
            .unwrap_or_else(|_| "https://models.github.ai/inference".to_string());
        let api_key = std::env::var("GITHUB_TOKEN")
            .context("GITHUB_TOKEN must be set to authenticate with the inference endpoint")?;
        Ok(Self::new(host, api_key, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAiProviderConfig::new("https://example.test/v1", "key", "gpt-4.1-mini")
            .with_api_version("2024-08-01-preview");
        assert_eq!(config.host, "https://example.test/v1");
        assert_eq!(config.api_version.as_deref(), Some("2024-08-01-preview"));
    }
}
