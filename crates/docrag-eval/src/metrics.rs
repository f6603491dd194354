//! Evaluation metrics and judge prompts

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Contexts the faithfulness prompt includes, best first
const FAITHFULNESS_CONTEXTS: usize = 3;

/// Context count at which the retrieval metric saturates
const TARGET_CONTEXTS: f32 = 5.0;

/// Quality dimension of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Relevance,
    Faithfulness,
    Completeness,
    Clarity,
    Retrieval,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Relevance,
        Metric::Faithfulness,
        Metric::Completeness,
        Metric::Clarity,
        Metric::Retrieval,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Relevance => "relevance",
            Metric::Faithfulness => "faithfulness",
            Metric::Completeness => "completeness",
            Metric::Clarity => "clarity",
            Metric::Retrieval => "retrieval",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::Relevance => "Measures how well the response addresses the user's query",
            Metric::Faithfulness => "Measures if the response is grounded in the retrieved context",
            Metric::Completeness => "Measures how thoroughly the response addresses the query",
            Metric::Clarity => "Measures how clear and well-structured the response is",
            Metric::Retrieval => "Measures how many distinct contexts were retrieved",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub score: f32,
    pub description: String,
    /// Set when the metric could not be computed; such scores are left out of the overall mean
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_contexts: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diversity: Option<f32>,
}

impl MetricScore {
    pub fn scored(metric: Metric, score: f32) -> Self {
        Self {
            score,
            description: metric.description().to_string(),
            error: None,
            num_contexts: None,
            diversity: None,
        }
    }

    pub fn failed(metric: Metric, error: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            description: metric.description().to_string(),
            error: Some(error.into()),
            num_contexts: None,
            diversity: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

const SCALE_FOOTER: &str = "Provide only a numeric score between 0.0 and 1.0.";

pub fn relevance_prompt(query: &str, response: &str) -> String {
    format!(
        "Rate the relevance of the response to the query on a scale of 0.0 to 1.0.

Query: {query}
Response: {response}

Criteria:
- 1.0: Response directly and completely addresses the query
- 0.8: Response mostly addresses the query with minor gaps
- 0.6: Response partially addresses the query
- 0.4: Response somewhat relates but misses key aspects
- 0.2: Response barely relates to the query
- 0.0: Response is completely irrelevant

{SCALE_FOOTER}"
    )
}

pub fn faithfulness_prompt(response: &str, contexts: &[String]) -> String {
    let context = contexts
        .iter()
        .take(FAITHFULNESS_CONTEXTS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Rate the faithfulness of the response to the provided context on a scale of 0.0 to 1.0.

Context: {context}
Response: {response}

Criteria:
- 1.0: Response is completely supported by the context, no hallucinations
- 0.8: Response is mostly supported with minor unsupported details
- 0.6: Response is partially supported but has some unsupported claims
- 0.4: Response has significant unsupported or contradictory information
- 0.2: Response is mostly unsupported by the context
- 0.0: Response contradicts or is completely unsupported by context

{SCALE_FOOTER}"
    )
}

pub fn completeness_prompt(query: &str, response: &str) -> String {
    format!(
        "Rate the completeness of the response to the query on a scale of 0.0 to 1.0.

Query: {query}
Response: {response}

Criteria:
- 1.0: Response thoroughly answers all aspects of the query
- 0.8: Response covers most aspects with minor gaps
- 0.6: Response covers main points but misses some important aspects
- 0.4: Response covers some aspects but leaves significant gaps
- 0.2: Response only partially addresses the query
- 0.0: Response fails to address the query adequately

{SCALE_FOOTER}"
    )
}

pub fn clarity_prompt(response: &str) -> String {
    format!(
        "Rate the clarity and readability of the response on a scale of 0.0 to 1.0.

Response: {response}

Criteria:
- 1.0: Response is very clear, well-structured, and easy to understand
- 0.8: Response is mostly clear with good structure
- 0.6: Response is reasonably clear but could be better structured
- 0.4: Response is somewhat unclear or poorly structured
- 0.2: Response is difficult to understand
- 0.0: Response is very unclear or confusing

{SCALE_FOOTER}"
    )
}

/// Score retrieval by how many contexts came back and how many of them are distinct
pub fn retrieval_score(contexts: &[String]) -> MetricScore {
    if contexts.is_empty() {
        return MetricScore {
            score: 0.0,
            description: "No contexts retrieved".to_string(),
            error: None,
            num_contexts: Some(0),
            diversity: None,
        };
    }

    let count = contexts.len();
    let distinct = contexts.iter().collect::<HashSet<_>>().len();
    let diversity = distinct as f32 / count as f32;
    let score = (count as f32 / TARGET_CONTEXTS * diversity).min(1.0);

    MetricScore {
        score,
        description: format!(
            "Retrieved {} contexts with {:.2} diversity",
            count, diversity
        ),
        error: None,
        num_contexts: Some(count),
        diversity: Some(diversity),
    }
}
