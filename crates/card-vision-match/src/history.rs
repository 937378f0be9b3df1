//! Bounded confidence history with a running average.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of scores kept per template.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Sliding window of the most recent match scores for one template.
///
/// The average is updated incrementally: after each push it moves by
/// `(score - average) / len`. Until the window fills this is the exact mean;
/// afterwards it is an exponential average with weight `1 / window`. Either
/// way a single update never moves the average away from the new score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredHistory")]
pub struct ConfidenceHistory {
    window: usize,
    scores: VecDeque<f32>,
    average: f32,
}

/// Sidecar form, normalized on load: a window of at least one, no more
/// scores than the window, and a finite average.
#[derive(Deserialize)]
struct StoredHistory {
    window: usize,
    scores: VecDeque<f32>,
    average: f32,
}

impl From<StoredHistory> for ConfidenceHistory {
    fn from(raw: StoredHistory) -> Self {
        let window = raw.window.max(1);
        let mut scores = raw.scores;
        while scores.len() > window {
            scores.pop_front();
        }
        let average = if raw.average.is_finite() {
            raw.average
        } else if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32
        };
        Self {
            window,
            scores,
            average,
        }
    }
}

impl Default for ConfidenceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl ConfidenceHistory {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            scores: VecDeque::with_capacity(window),
            average: 0.0,
        }
    }

    /// History seeded with one score.
    pub fn seeded(window: usize, score: f32) -> Self {
        let mut h = Self::new(window);
        h.push(score);
        h
    }

    /// Record a score (clamped to `[0, 1]`) and update the average.
    pub fn push(&mut self, score: f32) {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.scores.push_back(score);
        while self.scores.len() > self.window {
            self.scores.pop_front();
        }
        let n = self.scores.len() as f32;
        self.average += (score - self.average) / n;
    }

    #[inline]
    pub fn average(&self) -> f32 {
        self.average
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn last(&self) -> Option<f32> {
        self.scores.back().copied()
    }

    pub fn scores(&self) -> impl Iterator<Item = f32> + '_ {
        self.scores.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn keeps_only_the_window() {
        let mut h = ConfidenceHistory::new(3);
        for s in [0.1, 0.2, 0.3, 0.4, 0.5] {
            h.push(s);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.scores().collect::<Vec<_>>(), vec![0.3, 0.4, 0.5]);
    }

    #[test]
    fn average_is_exact_mean_until_full() {
        let mut h = ConfidenceHistory::new(10);
        for s in [0.9, 0.7, 0.8] {
            h.push(s);
        }
        assert_relative_eq!(h.average(), 0.8, epsilon = 1e-6);
    }

    #[test]
    fn each_push_moves_average_toward_score() {
        let mut h = ConfidenceHistory::new(4);
        let scores = [0.95, 0.2, 0.9, 0.9, 0.1, 0.99, 0.5, 0.97, 0.3, 0.85, 0.85, 0.6];
        for s in scores {
            let before = h.average();
            h.push(s);
            let after = h.average();
            if s > before {
                assert!(after > before && after <= s, "{before} -> {after} for {s}");
            } else if s < before {
                assert!(after < before && after >= s, "{before} -> {after} for {s}");
            }
        }
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let mut h = ConfidenceHistory::new(2);
        h.push(1.7);
        h.push(f32::NAN);
        assert_eq!(h.scores().collect::<Vec<_>>(), vec![1.0, 0.0]);
    }

    #[test]
    fn zero_window_from_sidecar_is_normalized() {
        let json = r#"{ "window": 0, "scores": [0.9, 0.8], "average": 0.85 }"#;
        let mut h: ConfidenceHistory = serde_json::from_str(json).unwrap();
        assert_eq!(h.window(), 1);
        assert_eq!(h.scores().collect::<Vec<_>>(), vec![0.8]);
        h.push(0.6);
        assert!(h.average().is_finite());
        assert_relative_eq!(h.average(), 0.6, epsilon = 1e-6);
    }
}
