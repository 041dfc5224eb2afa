//! Settings read from the environment (and `.env`, loaded by the binary).

use std::str::FromStr;
use std::time::Duration;

use crate::llm::LlmConfig;
use crate::workflows::{TranscriptPolicy, DEFAULT_PROMPT};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_RETAIN_ATTEMPTS: usize = 3;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub verbosity: u8,
    pub instructions: String,
    pub base_url: String,
    pub max_iterations: Option<usize>,
    pub retain_attempts: usize,
    pub http_timeout: Duration,
    pub retry_window: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<REDACTED>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("verbosity", &self.verbosity)
            .field("base_url", &self.base_url)
            .field("max_iterations", &self.max_iterations)
            .field("retain_attempts", &self.retain_attempts)
            .field("http_timeout", &self.http_timeout)
            .field("retry_window", &self.retry_window)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("ANTHROPIC_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let retry_secs: u64 = parse_var(&get, "MAKEITPASS_RETRY_SECS")?.unwrap_or(0);
        let verbosity: u8 = parse_var(&get, "VERBOSE")?.unwrap_or(0);

        Ok(Self {
            api_key,
            model: get("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parse_var(&get, "MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS),
            verbosity: verbosity.min(3),
            instructions: get("PROMPT").unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            base_url: get("ANTHROPIC_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_iterations: parse_var(&get, "MAKEITPASS_MAX_ITERATIONS")?,
            retain_attempts: parse_var(&get, "MAKEITPASS_RETAIN_ATTEMPTS")?
                .unwrap_or(DEFAULT_RETAIN_ATTEMPTS),
            http_timeout: Duration::from_secs(
                parse_var(&get, "MAKEITPASS_HTTP_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            retry_window: (retry_secs > 0).then(|| Duration::from_secs(retry_secs)),
        })
    }

    pub fn transcript_policy(&self) -> TranscriptPolicy {
        match self.retain_attempts {
            0 => TranscriptPolicy::Unbounded,
            n => TranscriptPolicy::RetainAttempts(n),
        }
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: self.http_timeout,
            retry_window: self.retry_window,
        }
    }
}

fn parse_var<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
