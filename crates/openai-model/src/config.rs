use std::fmt::Debug;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(40);

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    max_attempts: Option<u32>,
    backoff_bounds: Option<(Duration, Duration)>,
}

impl OpenAIConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            max_attempts: None,
            backoff_bounds: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL, e.g. a local OpenAI-compatible server.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets how many attempts a request may take in total, including the
    /// first one. Values below 1 are treated as 1.
    #[inline]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets the bounds of the randomized delay between two attempts.
    #[inline]
    pub fn with_backoff_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.backoff_bounds = Some((min, max.max(min)));
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        let (min_backoff, max_backoff) = self
            .backoff_bounds
            .unwrap_or((DEFAULT_MIN_BACKOFF, DEFAULT_MAX_BACKOFF));
        OpenAIConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            min_backoff,
            max_backoff,
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_bounds", &self.backoff_bounds)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) max_attempts: u32,
    pub(crate) min_backoff: Duration,
    pub(crate) max_backoff: Duration,
}

impl OpenAIConfig {
    /// Returns the model identifier.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the chat completion endpoint.
    #[inline]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Returns the total number of attempts per request.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .field("min_backoff", &self.min_backoff)
            .field("max_backoff", &self.max_backoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OpenAIConfigBuilder::with_api_key("sk-secret").build();
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(
            config.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.min_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(40));
    }

    #[test]
    fn test_overrides() {
        let config = OpenAIConfigBuilder::with_api_key("sk-secret")
            .with_model("local-model")
            .with_base_url("http://localhost:1234/v1/")
            .with_max_attempts(0)
            .with_backoff_bounds(Duration::from_secs(5), Duration::from_secs(2))
            .build();
        assert_eq!(config.model(), "local-model");
        assert_eq!(config.endpoint(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.max_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = OpenAIConfigBuilder::with_api_key("sk-secret").build();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
    }
}
