//! Controversy scoring result.

use serde::{Deserialize, Serialize};

/// Minimum score for an article to be flagged controversial.
pub const CONTROVERSY_THRESHOLD: f64 = 0.70;

/// Excerpt stored when no sentence qualified for scoring.
pub const NO_EXCERPT: &str = "Aucun extrait significatif";

/// Excerpt stored when the sentiment model failed.
pub const SCORING_ERROR: &str = "Erreur NLP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControversyResult {
    pub is_controversial: bool,
    pub score: f64,
    pub excerpt: String,
}

impl ControversyResult {
    /// Build a result from the best sentence score.
    ///
    /// The score is clamped to [0, 1] and rounded to three decimals. The flag
    /// is derived from the rounded value so it always agrees with the score.
    pub fn from_best(score: f64, excerpt: Option<&str>) -> Self {
        let score = round3(score.clamp(0.0, 1.0));
        Self {
            is_controversial: score >= CONTROVERSY_THRESHOLD,
            score,
            excerpt: excerpt.unwrap_or(NO_EXCERPT).to_string(),
        }
    }

    /// Result used when the model could not be loaded or failed mid-document.
    pub fn failed() -> Self {
        Self {
            is_controversial: false,
            score: 0.0,
            excerpt: SCORING_ERROR.to_string(),
        }
    }

    /// Result for structured markup that yielded no text.
    pub fn empty() -> Self {
        Self {
            is_controversial: false,
            score: 0.0,
            excerpt: String::new(),
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_follows_rounded_score() {
        let r = ControversyResult::from_best(0.69961, Some("x"));
        assert_eq!(r.score, 0.7);
        assert!(r.is_controversial);

        let r = ControversyResult::from_best(0.6994, Some("x"));
        assert_eq!(r.score, 0.699);
        assert!(!r.is_controversial);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(ControversyResult::from_best(1.4, None).score, 1.0);
        assert_eq!(ControversyResult::from_best(-0.2, None).score, 0.0);
    }

    #[test]
    fn test_placeholder_excerpt() {
        let r = ControversyResult::from_best(0.0, None);
        assert_eq!(r.excerpt, NO_EXCERPT);
        assert!(!r.is_controversial);
    }
}
