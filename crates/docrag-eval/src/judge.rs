//! Score judge trait and reply parsing

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use docrag_core::Result;

/// Score used when a judge reply holds no number
pub const FALLBACK_SCORE: f32 = 0.5;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*").expect("score pattern is valid"));

/// Trait for models that grade a prompt with a number in `[0, 1]`
#[async_trait]
pub trait ScoreJudge: Send + Sync {
    /// Identifier of the judging model
    fn model_name(&self) -> &str;

    /// Grade `prompt`; transport or API failures are errors, unparseable replies are not
    async fn score(&self, prompt: &str) -> Result<f32>;
}

/// Extract a score from a judge reply.
///
/// A plain number is taken as is. Otherwise the first number in the text is used,
/// and values in `(1, 10]` are read as a ten-point scale. The result is clamped to
/// `[0, 1]`. Returns `None` when the reply contains no number.
pub fn parse_score(reply: &str) -> Option<f32> {
    let reply = reply.trim();

    if let Ok(score) = reply.parse::<f32>() {
        if score.is_finite() {
            return Some(score.clamp(0.0, 1.0));
        }
    }

    let found = FIRST_NUMBER.find(reply)?;
    let mut score: f32 = found.as_str().parse().ok()?;
    if score > 1.0 && score <= 10.0 {
        score /= 10.0;
    }
    Some(score.clamp(0.0, 1.0))
}

/// [`parse_score`], falling back to [`FALLBACK_SCORE`] with a warning
pub fn score_reply(reply: &str) -> f32 {
    parse_score(reply).unwrap_or_else(|| {
        warn!(reply, "could not parse a score from judge reply");
        FALLBACK_SCORE
    })
}
