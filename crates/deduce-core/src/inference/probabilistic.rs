use super::constraint::{Deductions, deduce_known};
use super::utils::binary_entropy;
use super::{EngineKind, InferenceContext, InferenceEngine, InferenceResult};
use crate::model::KeywordIndex;
use statrs::distribution::{Continuous, Normal};
use std::collections::BTreeSet;

const NORMALIZE_PASSES: usize = 8;
const NORMALIZE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilisticConfig {
    pub answer_threshold: f64,
    pub wrong_threshold: f64,
    pub min_variance: f64,
    pub high_confidence: f64,
}

impl Default for ProbabilisticConfig {
    fn default() -> Self {
        Self {
            answer_threshold: 0.95,
            wrong_threshold: 0.05,
            min_variance: 0.1,
            high_confidence: 0.7,
        }
    }
}

/// Approximate marginals via per-guess Gaussian likelihood updates.
#[derive(Debug, Clone, Default)]
pub struct ProbabilisticInference {
    config: ProbabilisticConfig,
}

impl ProbabilisticInference {
    pub fn new(config: ProbabilisticConfig) -> Self {
        Self { config }
    }

    fn posterior_marginals(&self, ctx: &InferenceContext, known: &Deductions) -> Vec<f64> {
        let mut probabilities = vec![ctx.prior(); ctx.keyword_count];
        for &index in &known.answers {
            probabilities[index] = 1.0;
        }
        for &index in &known.wrongs {
            probabilities[index] = 0.0;
        }
        renormalize(&mut probabilities, known, ctx.answer_count);

        for guess in &ctx.history {
            let snapshot = probabilities.clone();
            for &keyword in &guess.guessed {
                if known.is_known(keyword) || keyword >= ctx.keyword_count {
                    continue;
                }
                let (mean, variance) = guess
                    .guessed
                    .iter()
                    .filter(|&&other| other != keyword && other < ctx.keyword_count)
                    .fold((0.0, 0.0), |(mean, variance), &other| {
                        let p = snapshot[other];
                        (mean + p, variance + p * (1.0 - p))
                    });
                let Ok(normal) = Normal::new(mean, variance.max(self.config.min_variance).sqrt())
                else {
                    continue;
                };
                let observed = guess.correct_count as f64;
                let given_answer = normal.pdf(observed - 1.0);
                let given_wrong = normal.pdf(observed);
                let prior = snapshot[keyword];
                let evidence = prior * given_answer + (1.0 - prior) * given_wrong;
                if evidence > f64::MIN_POSITIVE {
                    probabilities[keyword] = prior * given_answer / evidence;
                }
            }
            renormalize(&mut probabilities, known, ctx.answer_count);
        }
        probabilities
    }

    fn recommend(
        &self,
        ctx: &InferenceContext,
        probabilities: &[f64],
        known: &Deductions,
    ) -> Vec<KeywordIndex> {
        let mut order: Vec<KeywordIndex> = ctx.revealed_answers.iter().copied().collect();
        order.extend(known.answers.iter().copied());

        let mut likely: Vec<KeywordIndex> = (0..probabilities.len())
            .filter(|&i| probabilities[i] >= self.config.high_confidence)
            .collect();
        likely.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]).then(a.cmp(&b)));
        order.extend(likely);

        let mut uncertain: Vec<KeywordIndex> = (0..probabilities.len())
            .filter(|&i| (0.4..=0.6).contains(&probabilities[i]))
            .collect();
        uncertain.sort_by(|&a, &b| {
            (probabilities[a] - 0.5)
                .abs()
                .total_cmp(&(probabilities[b] - 0.5).abs())
                .then(a.cmp(&b))
        });
        order.extend(uncertain);

        let mut rest: Vec<KeywordIndex> = (0..probabilities.len()).collect();
        rest.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]).then(a.cmp(&b)));
        order.extend(rest);

        let mut guess: Vec<KeywordIndex> = Vec::with_capacity(ctx.answer_count);
        for index in order {
            if guess.len() >= ctx.answer_count {
                break;
            }
            if index < probabilities.len() && !known.wrongs.contains(&index) && !guess.contains(&index)
            {
                guess.push(index);
            }
        }
        guess.sort_unstable();
        guess
    }
}

impl InferenceEngine for ProbabilisticInference {
    fn kind(&self) -> EngineKind {
        EngineKind::Probabilistic
    }

    fn infer(&mut self, ctx: &InferenceContext) -> InferenceResult {
        let known = deduce_known(ctx);
        if known.contradictory || ctx.keyword_count == 0 {
            return InferenceResult::uninformed(ctx);
        }

        let probabilities = self.posterior_marginals(ctx, &known);

        let mut certain_answers: BTreeSet<KeywordIndex> = known.answers.clone();
        let mut certain_wrongs: BTreeSet<KeywordIndex> = known.wrongs.clone();
        for (index, &p) in probabilities.iter().enumerate() {
            if p >= self.config.answer_threshold {
                certain_answers.insert(index);
            } else if p <= self.config.wrong_threshold {
                certain_wrongs.insert(index);
            }
        }

        let entropy: f64 = probabilities.iter().map(|&p| binary_entropy(p)).sum();
        let normalized_entropy = entropy / ctx.keyword_count as f64;
        let likely = probabilities
            .iter()
            .filter(|&&p| p >= self.config.high_confidence)
            .count();
        let likely_share = (likely as f64 / ctx.answer_count.max(1) as f64).min(1.0);
        let confidence = (0.6 * (1.0 - normalized_entropy) + 0.4 * likely_share).clamp(0.0, 1.0);

        let recommended_guess = self.recommend(ctx, &probabilities, &known);

        InferenceResult {
            probabilities,
            certain_answers,
            certain_wrongs,
            candidate_solutions: None,
            recommended_guess,
            confidence,
            truncation: None,
        }
    }

    fn reset(&mut self) {}
}

/// Rescales undetermined keywords so that, together with the known answers,
/// the marginals sum to the answer count.
fn renormalize(probabilities: &mut [f64], known: &Deductions, answer_count: usize) {
    let open: Vec<KeywordIndex> = (0..probabilities.len())
        .filter(|&i| !known.is_known(i))
        .collect();
    if open.is_empty() {
        return;
    }
    let target = answer_count.saturating_sub(known.answers.len()) as f64;

    for _ in 0..NORMALIZE_PASSES {
        let sum: f64 = open.iter().map(|&i| probabilities[i]).sum();
        if sum <= f64::MIN_POSITIVE {
            let uniform = (target / open.len() as f64).min(1.0);
            for &i in &open {
                probabilities[i] = uniform;
            }
            return;
        }
        if (sum - target).abs() < NORMALIZE_TOLERANCE {
            return;
        }
        let scale = target / sum;
        for &i in &open {
            probabilities[i] = (probabilities[i] * scale).clamp(0.0, 1.0);
        }
    }
}
