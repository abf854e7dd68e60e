use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

use pg_chat_openai::{OpenAIConfig, OpenAIConfigBuilder};

/// Error returned when the settings can't be loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsError {
    /// A required environment variable is not set.
    MissingVar(&'static str),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(name) => {
                write!(f, "{name} environment variable is not set")
            }
        }
    }
}

impl StdError for SettingsError {}

/// Settings read from the environment.
///
/// | Variable          | Required | Meaning                           |
/// |-------------------|----------|-----------------------------------|
/// | `OPENAI_API_KEY`  | yes      | credential for the chat API       |
/// | `OPENAI_BASE_URL` | no       | base URL of the chat API          |
/// | `OPENAI_MODEL`    | no       | model name, `AI_MODEL` also works |
/// | `DATABASE_URL`    | yes      | PostgreSQL connection string      |
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// The API key.
    pub api_key: String,
    /// The base URL, if not the default one.
    pub base_url: Option<String>,
    /// The model name, if not the default one.
    pub model: Option<String>,
    /// The database connection string.
    pub database_url: String,
}

impl Settings {
    /// Loads the settings from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        // Empty values count as unset.
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let required = |name: &'static str| {
            get(name).ok_or(SettingsError::MissingVar(name))
        };

        Ok(Self {
            api_key: required("OPENAI_API_KEY")?,
            base_url: get("OPENAI_BASE_URL"),
            model: get("OPENAI_MODEL").or_else(|| get("AI_MODEL")),
            database_url: required("DATABASE_URL")?,
        })
    }

    /// Returns the provider configuration described by the settings.
    pub fn openai_config(&self) -> OpenAIConfig {
        let mut builder = OpenAIConfigBuilder::with_api_key(&self.api_key);
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        builder.build()
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<deducted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("database_url", &"<deducted>")
            .finish()
    }
}
