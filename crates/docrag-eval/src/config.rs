//! Configuration for the judge model

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use docrag_core::{Error, Result};

/// Connection settings for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl JudgeConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";

    /// Create configuration with default endpoint and model
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            model: get("JUDGE_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            timeout_secs: 60,
        };

        if config.api_key.is_none() && config.base_url == Self::DEFAULT_BASE_URL {
            return Err(Error::Configuration(
                "OPENAI_API_KEY environment variable not found".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Where evaluations are kept between runs unless `EVAL_HISTORY_PATH` says otherwise
pub const DEFAULT_HISTORY_PATH: &str = ".docrag/evaluations.json";

/// Location of the persisted evaluation history, from the environment
pub fn history_path_from_env() -> PathBuf {
    dotenvy::dotenv().ok();
    history_path_from_lookup(|key| env::var(key).ok())
}

pub fn history_path_from_lookup<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("EVAL_HISTORY_PATH")
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH))
}
