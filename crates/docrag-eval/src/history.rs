//! Bounded evaluation history and summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use docrag_core::Result;

use crate::evaluator::Evaluation;
use crate::metrics::Metric;

/// Evaluations kept before the oldest is dropped
pub const DEFAULT_CAPACITY: usize = 100;

/// Evaluations counted as "recent" in a summary
const RECENT_WINDOW: usize = 10;

/// Difference between recent and overall averages that counts as a trend
const TREND_BAND: f32 = 0.05;

/// Direction of recent scores relative to the whole history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
    NoData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Improving => "Improving",
            Trend::Declining => "Declining",
            Trend::Stable => "Stable",
            Trend::InsufficientData => "Insufficient data",
            Trend::NoData => "No data",
        };
        f.write_str(label)
    }
}

/// Aggregate view over the history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total_evaluations: usize,
    /// Per-metric means over every kept evaluation, plus `overall`
    pub average_scores: BTreeMap<String, f32>,
    /// The same means over the most recent evaluations
    pub recent_scores: BTreeMap<String, f32>,
    pub recent_trend: Trend,
    pub last_evaluation: Option<DateTime<Utc>>,
}

/// Fixed-capacity ring buffer of evaluations, oldest evicted first
#[derive(Debug, Clone)]
pub struct EvaluationHistory {
    capacity: usize,
    entries: VecDeque<Evaluation>,
}

impl Default for EvaluationHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EvaluationHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Read a history saved with [`save`](Self::save), keeping the newest `capacity`
    /// entries. A missing file yields an empty history.
    pub fn load(path: &Path, capacity: usize) -> Result<Self> {
        let mut history = Self::with_capacity(capacity);
        if !path.exists() {
            debug!(path = %path.display(), "no evaluation history yet");
            return Ok(history);
        }

        let entries: Vec<Evaluation> = serde_json::from_str(&fs::read_to_string(path)?)?;
        for evaluation in entries {
            history.push(evaluation);
        }
        Ok(history)
    }

    /// Write the kept evaluations, oldest first, as a JSON array
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }

    pub fn push(&mut self, evaluation: Evaluation) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(evaluation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Evaluation> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Evaluation> {
        self.entries.back()
    }

    pub fn summary(&self) -> EvaluationSummary {
        if self.entries.is_empty() {
            return EvaluationSummary {
                total_evaluations: 0,
                average_scores: BTreeMap::new(),
                recent_scores: BTreeMap::new(),
                recent_trend: Trend::NoData,
                last_evaluation: None,
            };
        }

        let all: Vec<&Evaluation> = self.entries.iter().collect();
        let recent = &all[all.len().saturating_sub(RECENT_WINDOW)..];

        let average_scores = averages(&all);
        let recent_scores = averages(recent);

        let recent_trend = if all.len() < 2 {
            Trend::InsufficientData
        } else {
            let recent_overall = recent_scores.get("overall").copied().unwrap_or_default();
            let all_overall = average_scores.get("overall").copied().unwrap_or_default();
            if recent_overall > all_overall + TREND_BAND {
                Trend::Improving
            } else if recent_overall < all_overall - TREND_BAND {
                Trend::Declining
            } else {
                Trend::Stable
            }
        };

        EvaluationSummary {
            total_evaluations: all.len(),
            average_scores,
            recent_scores,
            recent_trend,
            last_evaluation: self.latest().map(|evaluation| evaluation.timestamp),
        }
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0f32, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f32 }
}

/// Per-metric means over the evaluations that recorded the metric, failed ones included
fn averages(evaluations: &[&Evaluation]) -> BTreeMap<String, f32> {
    let mut result: BTreeMap<String, f32> = Metric::ALL
        .iter()
        .map(|metric| {
            let score = mean(
                evaluations
                    .iter()
                    .filter_map(|evaluation| evaluation.metrics.get(metric))
                    .map(|metric_score| metric_score.score),
            );
            (metric.name().to_string(), score)
        })
        .collect();

    result.insert(
        "overall".to_string(),
        mean(evaluations.iter().map(|evaluation| evaluation.overall_score)),
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricScore;

    fn evaluation(overall: f32) -> Evaluation {
        let metrics = Metric::ALL
            .iter()
            .map(|metric| (*metric, MetricScore::scored(*metric, overall)))
            .collect();
        Evaluation {
            timestamp: Utc::now(),
            query: "q".to_string(),
            response: "r".to_string(),
            sources: Vec::new(),
            metrics,
            overall_score: overall,
        }
    }

    #[test]
    fn test_empty_history_has_no_data() {
        let summary = EvaluationHistory::default().summary();
        assert_eq!(summary.total_evaluations, 0);
        assert_eq!(summary.recent_trend, Trend::NoData);
        assert!(summary.average_scores.is_empty());
        assert!(summary.last_evaluation.is_none());
    }

    #[test]
    fn test_single_entry_is_insufficient() {
        let mut history = EvaluationHistory::default();
        history.push(evaluation(0.7));
        let summary = history.summary();
        assert_eq!(summary.recent_trend, Trend::InsufficientData);
        assert!((summary.average_scores["overall"] - 0.7).abs() < 1e-6);
        assert!((summary.average_scores["clarity"] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let mut history = EvaluationHistory::with_capacity(3);
        for score in [0.1, 0.2, 0.3, 0.4] {
            history.push(evaluation(score));
        }
        assert_eq!(history.len(), 3);
        let kept: Vec<f32> = history.iter().map(|e| e.overall_score).collect();
        assert_eq!(kept, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_trend_compares_recent_to_all() {
        let mut improving = EvaluationHistory::default();
        for _ in 0..10 {
            improving.push(evaluation(0.2));
        }
        for _ in 0..10 {
            improving.push(evaluation(0.9));
        }
        assert_eq!(improving.summary().recent_trend, Trend::Improving);

        let mut declining = EvaluationHistory::default();
        for _ in 0..10 {
            declining.push(evaluation(0.9));
        }
        for _ in 0..10 {
            declining.push(evaluation(0.2));
        }
        assert_eq!(declining.summary().recent_trend, Trend::Declining);

        let mut stable = EvaluationHistory::default();
        for _ in 0..15 {
            stable.push(evaluation(0.6));
        }
        assert_eq!(stable.summary().recent_trend, Trend::Stable);
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(Trend::InsufficientData.to_string(), "Insufficient data");
        assert_eq!(Trend::NoData.to_string(), "No data");
    }
}
