//! Configuration for the ESI client
//!
//! Supports environment-based configuration with sensible defaults.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

/// Default ESI base URL
const DEFAULT_ESI_URL: &str = "https://esi.evetech.net/latest";

/// Default `User-Agent`; CCP asks for contact details, so override this in production
const DEFAULT_USER_AGENT: &str = concat!("esi-client/", env!("CARGO_PKG_VERSION"));

/// Default bound on concurrent requests per fan-out
const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// ESI server ("datasource") to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datasource {
    /// The live server
    #[default]
    Tranquility,
    /// The public test server
    Singularity,
}

impl Datasource {
    /// Parse from the `ESI_DATASOURCE` environment variable
    pub fn from_env() -> Self {
        match env::var("ESI_DATASOURCE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "singularity" | "sisi" | "test" => Self::Singularity,
            _ => Self::Tranquility,
        }
    }

    /// Value of the `datasource` query parameter
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tranquility => "tranquility",
            Self::Singularity => "singularity",
        }
    }
}

impl fmt::Display for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL including the version segment
    pub base_url: String,
    /// Server to query
    pub datasource: Datasource,
    /// Language for localized fields (`en`, `de`, `fr`, `ja`, `ru`, `ko`, `zh`)
    pub language: Option<String>,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Maximum concurrent requests issued by one fan-out
    pub max_concurrency: usize,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ESI_URL.to_string(),
            datasource: Datasource::default(),
            language: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `ESI_BASE_URL`: Base URL (defaults to the public ESI host)
    /// - `ESI_DATASOURCE`: `tranquility` or `singularity`
    /// - `ESI_LANGUAGE`: Language for localized fields
    /// - `ESI_USER_AGENT`: `User-Agent` header
    /// - `ESI_TIMEOUT_SECS`: Request timeout in seconds
    /// - `ESI_MAX_CONCURRENCY`: Bound on concurrent requests per fan-out
    pub fn from_env() -> ApiResult<Self> {
        let base_url = env::var("ESI_BASE_URL").unwrap_or_else(|_| DEFAULT_ESI_URL.to_string());
        let user_agent =
            env::var("ESI_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        let language = env::var("ESI_LANGUAGE").ok().filter(|l| !l.is_empty());

        let timeout = match env::var("ESI_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                ApiError::config(format!("ESI_TIMEOUT_SECS is not a number: {raw}"))
            })?),
            Err(_) => Duration::from_secs(30),
        };

        let max_concurrency = match env::var("ESI_MAX_CONCURRENCY") {
            Ok(raw) => raw.parse().map_err(|_| {
                ApiError::config(format!("ESI_MAX_CONCURRENCY is not a number: {raw}"))
            })?,
            Err(_) => DEFAULT_MAX_CONCURRENCY,
        };

        Ok(Self {
            base_url,
            datasource: Datasource::from_env(),
            language,
            user_agent,
            timeout,
            max_concurrency,
        })
    }

    /// Configuration for the live server
    #[must_use]
    pub fn tranquility() -> Self {
        Self::default()
    }

    /// Configuration for the public test server
    #[must_use]
    pub fn singularity() -> Self {
        Self {
            datasource: Datasource::Singularity,
            ..Self::default()
        }
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the datasource
    #[must_use]
    pub fn with_datasource(mut self, datasource: Datasource) -> Self {
        self.datasource = datasource;
        self
    }

    /// Builder-style method to set the language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Builder-style method to set the `User-Agent`
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set the fan-out bound
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ApiError::config("user_agent cannot be empty"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        if self.max_concurrency == 0 {
            return Err(ApiError::config("max_concurrency cannot be zero"));
        }

        Ok(())
    }
}
