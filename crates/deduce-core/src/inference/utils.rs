//! Scoring helpers shared by the strategy layer.

use crate::model::{GuessRecord, KeywordIndex, PlayerId};
use serde::Serialize;

/// Entropy in bits of a Bernoulli(p) variable.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
}

/// `1 - |2p - 1|`: 1 at p = 0.5, 0 at certainty.
pub fn uncertainty(p: f64) -> f64 {
    1.0 - (2.0 * p - 1.0).abs()
}

/// Entropy, in bits, of the correctness count a guess would reveal, treating
/// members as independent with the given marginals.
pub fn expected_info_gain(probabilities: &[f64], guess: &[KeywordIndex]) -> f64 {
    let mut distribution = vec![1.0f64];
    for &index in guess {
        let p = probabilities.get(index).copied().unwrap_or(0.0).clamp(0.0, 1.0);
        let mut next = vec![0.0; distribution.len() + 1];
        for (hits, &mass) in distribution.iter().enumerate() {
            next[hits] += mass * (1.0 - p);
            next[hits + 1] += mass * p;
        }
        distribution = next;
    }
    distribution
        .into_iter()
        .filter(|&mass| mass > 0.0)
        .map(|mass| -mass * mass.log2())
        .sum()
}

/// Mean probability that a member of `guess` is wrong.
pub fn risk_level(probabilities: &[f64], guess: &[KeywordIndex]) -> f64 {
    if guess.is_empty() {
        return 0.0;
    }
    let total: f64 = guess
        .iter()
        .map(|&index| 1.0 - probabilities.get(index).copied().unwrap_or(0.0))
        .sum();
    total / guess.len() as f64
}

/// One minus the average overlap fraction with previous guesses.
pub fn diversity_score(guess: &[KeywordIndex], history: &[GuessRecord]) -> f64 {
    if history.is_empty() || guess.is_empty() {
        return 1.0;
    }
    let overlap: f64 = history
        .iter()
        .map(|record| {
            let shared = guess.iter().filter(|&&k| record.contains(k)).count();
            shared as f64 / guess.len() as f64
        })
        .sum();
    1.0 - overlap / history.len() as f64
}

/// How often `index` was part of a previous guess.
pub fn guess_frequency(index: KeywordIndex, history: &[GuessRecord]) -> usize {
    history.iter().filter(|record| record.contains(index)).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerPattern {
    pub guesses: usize,
    pub average_correct_rate: f64,
    pub consistency: f64,
    pub improvement_rate: f64,
}

/// Summarizes how well `player_id` has been scoring so far.
pub fn player_pattern(
    history: &[GuessRecord],
    player_id: PlayerId,
    answer_count: usize,
) -> PlayerPattern {
    let rates: Vec<f64> = history
        .iter()
        .filter(|record| record.player_id == player_id)
        .map(|record| record.correct_count as f64 / answer_count.max(1) as f64)
        .collect();
    if rates.is_empty() {
        return PlayerPattern {
            guesses: 0,
            average_correct_rate: 0.0,
            consistency: 1.0,
            improvement_rate: 0.0,
        };
    }
    let mean = rates.iter().sum::<f64>() / rates.len() as f64;
    let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / rates.len() as f64;
    let improvement_rate = if rates.len() > 1 {
        (rates[rates.len() - 1] - rates[0]) / (rates.len() - 1) as f64
    } else {
        0.0
    };
    PlayerPattern {
        guesses: rates.len(),
        average_correct_rate: mean,
        consistency: (1.0 - variance.sqrt()).clamp(0.0, 1.0),
        improvement_rate,
    }
}
