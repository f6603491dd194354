//! Multi-metric response evaluator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use docrag_core::{Error, Result};

use crate::history::{EvaluationHistory, EvaluationSummary};
use crate::judge::ScoreJudge;
use crate::metrics::{
    Metric, MetricScore, clarity_prompt, completeness_prompt, faithfulness_prompt,
    relevance_prompt, retrieval_score,
};

/// One graded answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub sources: Vec<String>,
    pub metrics: BTreeMap<Metric, MetricScore>,
    /// Mean of the metrics that did not fail; 0 when all failed
    pub overall_score: f32,
}

/// Grades answers with a judge model and keeps a bounded history
pub struct ResponseEvaluator<J: ScoreJudge + ?Sized> {
    judge: Arc<J>,
    history: Mutex<EvaluationHistory>,
}

impl<J: ScoreJudge + ?Sized> ResponseEvaluator<J> {
    pub fn new(judge: Arc<J>) -> Self {
        Self::with_history(judge, EvaluationHistory::default())
    }

    pub fn with_history(judge: Arc<J>, history: EvaluationHistory) -> Self {
        Self {
            judge,
            history: Mutex::new(history),
        }
    }

    /// Grade `response` to `query` given the contexts it was generated from.
    ///
    /// The four judged metrics run concurrently. A metric whose judge call fails is
    /// recorded with score 0 and its error, and does not count toward the overall score.
    pub async fn evaluate(
        &self,
        query: &str,
        response: &str,
        contexts: &[String],
        sources: &[String],
    ) -> Result<Evaluation> {
        let (relevance, faithfulness, completeness, clarity) = futures::join!(
            self.judged(Metric::Relevance, relevance_prompt(query, response)),
            self.judged(Metric::Faithfulness, faithfulness_prompt(response, contexts)),
            self.judged(Metric::Completeness, completeness_prompt(query, response)),
            self.judged(Metric::Clarity, clarity_prompt(response)),
        );

        let metrics: BTreeMap<Metric, MetricScore> = [
            (Metric::Relevance, relevance),
            (Metric::Faithfulness, faithfulness),
            (Metric::Completeness, completeness),
            (Metric::Clarity, clarity),
            (Metric::Retrieval, retrieval_score(contexts)),
        ]
        .into_iter()
        .collect();

        let successful: Vec<f32> = metrics
            .values()
            .filter(|metric| !metric.is_error())
            .map(|metric| metric.score)
            .collect();
        let overall_score = if successful.is_empty() {
            0.0
        } else {
            successful.iter().sum::<f32>() / successful.len() as f32
        };

        let evaluation = Evaluation {
            timestamp: Utc::now(),
            query: query.to_string(),
            response: response.to_string(),
            sources: sources.to_vec(),
            metrics,
            overall_score,
        };

        self.lock_history()?.push(evaluation.clone());
        info!(
            overall = evaluation.overall_score,
            judge = self.judge.model_name(),
            "evaluated response"
        );

        Ok(evaluation)
    }

    pub fn summary(&self) -> Result<EvaluationSummary> {
        Ok(self.lock_history()?.summary())
    }

    /// Persist the kept evaluations so a later run can continue the history
    pub fn save_history(&self, path: &Path) -> Result<()> {
        self.lock_history()?.save(path)
    }

    async fn judged(&self, metric: Metric, prompt: String) -> MetricScore {
        match self.judge.score(&prompt).await {
            Ok(score) => MetricScore::scored(metric, score),
            Err(e) => {
                error!(metric = %metric, error = %e, "metric evaluation failed");
                MetricScore::failed(metric, e.to_string())
            }
        }
    }

    fn lock_history(&self) -> Result<std::sync::MutexGuard<'_, EvaluationHistory>> {
        self.history
            .lock()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))
    }
}
