//! Quality evaluation of retrieval-augmented answers
//!
//! A judge model grades each answer on relevance, faithfulness, completeness and
//! clarity; a retrieval metric is computed locally. Results accumulate in a bounded
//! history that can be summarised into averages and a trend.

mod client;
mod config;
mod evaluator;
mod history;
mod judge;
mod metrics;


pub use client::OpenAiJudge;
pub use config::{
    DEFAULT_HISTORY_PATH, JudgeConfig, history_path_from_env, history_path_from_lookup,
};
pub use evaluator::{Evaluation, ResponseEvaluator};
pub use history::{DEFAULT_CAPACITY, EvaluationHistory, EvaluationSummary, Trend};
pub use judge::{FALLBACK_SCORE, ScoreJudge, parse_score, score_reply};
pub use metrics::{Metric, MetricScore, retrieval_score};

// Re-export core types for convenience
pub use docrag_core::{Error, Result};
