//! Distance → confidence tier.
//!
//! Distances come from the retriever, lower is closer. The thresholds
//! decide how close a local match has to be before it is trusted over the
//! web.

use super::types::Confidence;

pub const DEFAULT_TOP_K: usize = 3;

/// Score reported when there is nothing to score.
pub const EMPTY_SCORE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Scores strictly below this are HIGH.
    pub high: f32,
    /// Scores strictly below this (and not HIGH) are MEDIUM.
    pub medium: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high: 0.65,
            medium: 0.75,
        }
    }
}

impl Thresholds {
    pub fn new(high: f32, medium: f32) -> Result<Self, String> {
        if !high.is_finite() || !medium.is_finite() {
            return Err("Confidence thresholds must be finite".to_string());
        }
        if high >= medium {
            return Err(format!(
                "High threshold ({high}) must be below medium threshold ({medium})"
            ));
        }
        Ok(Self { high, medium })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub confidence: Confidence,
    pub score: f32,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceEvaluator {
    thresholds: Thresholds,
}

impl ConfidenceEvaluator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Score by the smallest distance.
    pub fn evaluate(&self, distances: &[f32]) -> EvaluationResult {
        self.evaluate_with(distances, DEFAULT_TOP_K, false)
    }

    /// With `use_average`, the mean of the first `top_k` distances, which
    /// assumes best-first order as returned by a [`Retriever`]. Otherwise
    /// the smallest distance, whatever the order.
    ///
    /// [`Retriever`]: super::traits::Retriever
    pub fn evaluate_with(
        &self,
        distances: &[f32],
        top_k: usize,
        use_average: bool,
    ) -> EvaluationResult {
        if distances.is_empty() {
            return EvaluationResult {
                confidence: Confidence::Low,
                score: EMPTY_SCORE,
                rationale: "no results found in local index".to_string(),
            };
        }

        let score = if use_average {
            let window = &distances[..top_k.max(1).min(distances.len())];
            window.iter().sum::<f32>() / window.len() as f32
        } else {
            distances
                .iter()
                .copied()
                .reduce(f32::min)
                .unwrap_or(EMPTY_SCORE)
        };

        // NaN fails both comparisons and lands in LOW.
        let (confidence, rationale) = if score < self.thresholds.high {
            (Confidence::High, format!("Strong match found (distance: {score:.3})"))
        } else if score < self.thresholds.medium {
            (Confidence::Medium, format!("Moderate match found (distance: {score:.3})"))
        } else {
            (Confidence::Low, format!("Weak or no match (distance: {score:.3})"))
        };

        EvaluationResult {
            confidence,
            score,
            rationale,
        }
    }
}
