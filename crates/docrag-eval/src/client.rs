//! OpenAI-compatible judge client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docrag_core::{Error, Result};

use crate::config::JudgeConfig;
use crate::judge::{ScoreJudge, score_reply};

/// Judge backed by a chat-completions endpoint
pub struct OpenAiJudge {
    config: JudgeConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

impl OpenAiJudge {
    /// Replies are a single number
    const MAX_TOKENS: u32 = 10;

    pub fn new(config: JudgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::LlmProvider(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new judge from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(JudgeConfig::from_env()?)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: Self::MAX_TOKENS,
            temperature: 0.0,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::LlmProvider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LlmProvider(format!(
                "judge request failed with status {}: {}",
                status, error_text
            )));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmProvider(e.to_string()))?;

        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::LlmProvider("judge returned no choices".to_string()))
    }
}

#[async_trait]
impl ScoreJudge for OpenAiJudge {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn score(&self, prompt: &str) -> Result<f32> {
        let reply = self.complete(prompt).await?;
        debug!(model = %self.config.model, reply = %reply.trim(), "judge replied");
        Ok(score_reply(&reply))
    }
}
