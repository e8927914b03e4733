use super::constraint::{Constraint, derive_constraints};
use super::{EngineKind, InferenceContext, InferenceEngine, InferenceResult, Truncation};
use crate::model::KeywordIndex;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{Level, event};

const DEFAULT_MAX_SOLUTIONS: usize = 1_000;
const DEFAULT_TIMEOUT_MS: u64 = 250;
const DEADLINE_CHECK_INTERVAL: u64 = 512;
const UNCERTAIN_BAND: (f64, f64) = (0.3, 0.7);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalConfig {
    pub max_solutions: usize,
    pub timeout: Option<Duration>,
}

impl Default for LogicalConfig {
    fn default() -> Self {
        Self {
            max_solutions: DEFAULT_MAX_SOLUTIONS,
            timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
        }
    }
}

/// Exact deduction by enumerating every answer set consistent with the
/// derived constraints.
#[derive(Debug, Clone, Default)]
pub struct LogicalInference {
    config: LogicalConfig,
}

impl LogicalInference {
    pub fn new(config: LogicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> LogicalConfig {
        self.config
    }
}

impl InferenceEngine for LogicalInference {
    fn kind(&self) -> EngineKind {
        EngineKind::Logical
    }

    fn infer(&mut self, ctx: &InferenceContext) -> InferenceResult {
        let set = derive_constraints(ctx);
        if set.deductions.contradictory || ctx.answer_count > ctx.keyword_count {
            return InferenceResult::uninformed(ctx);
        }

        let forced: Vec<KeywordIndex> = set.deductions.answers.iter().copied().collect();
        let candidates: Vec<KeywordIndex> = (0..ctx.keyword_count)
            .filter(|index| !set.deductions.is_known(*index))
            .collect();
        let mut search = Search::new(
            ctx.keyword_count,
            &set.constraints,
            &forced,
            candidates,
            self.config,
        );
        let slots = ctx.answer_count.saturating_sub(forced.len());
        if forced.len() <= ctx.answer_count && search.admits(0, slots) {
            search.run(0, slots);
        }

        let truncation = search.truncation;
        let solutions = search.solutions;
        if truncation.is_some() {
            event!(
                target: "deduce_core::logical",
                Level::WARN,
                truncation = ?truncation,
                solutions = solutions.len(),
                nodes = search.nodes,
                history = ctx.history.len(),
                message = "solution search stopped early; result degraded"
            );
        }
        if solutions.is_empty() {
            let mut result = InferenceResult::uninformed(ctx);
            result.truncation = truncation;
            return result;
        }

        summarize(ctx, solutions, truncation, &set.deductions.answers, &set.deductions.wrongs)
    }

    fn reset(&mut self) {}
}

fn summarize(
    ctx: &InferenceContext,
    solutions: Vec<Vec<KeywordIndex>>,
    truncation: Option<Truncation>,
    fixed_answers: &BTreeSet<KeywordIndex>,
    fixed_wrongs: &BTreeSet<KeywordIndex>,
) -> InferenceResult {
    let total = solutions.len();
    let mut counts = vec![0usize; ctx.keyword_count];
    for solution in &solutions {
        for &index in solution {
            counts[index] += 1;
        }
    }
    let mut probabilities: Vec<f64> = counts
        .iter()
        .map(|&count| count as f64 / total as f64)
        .collect();

    let (certain_answers, certain_wrongs) = if truncation.is_some() {
        for &index in fixed_answers {
            probabilities[index] = 1.0;
        }
        for &index in fixed_wrongs {
            probabilities[index] = 0.0;
        }
        (fixed_answers.clone(), fixed_wrongs.clone())
    } else {
        (
            (0..ctx.keyword_count).filter(|&i| counts[i] == total).collect(),
            (0..ctx.keyword_count).filter(|&i| counts[i] == 0).collect(),
        )
    };

    let mut confidence = if total == 1 {
        1.0
    } else {
        let spread = (10.0 / total as f64).min(1.0);
        let share = certain_answers.len() as f64 / ctx.answer_count.max(1) as f64;
        0.5 * spread + 0.5 * share
    };
    if truncation.is_some() {
        confidence *= 0.5;
    }

    let recommended_guess = if total == 1 && truncation.is_none() {
        solutions[0].clone()
    } else {
        recommend(&probabilities, &certain_wrongs, ctx.answer_count)
    };

    InferenceResult {
        probabilities,
        certain_answers,
        certain_wrongs,
        candidate_solutions: Some(solutions),
        recommended_guess,
        confidence: confidence.clamp(0.0, 1.0),
        truncation,
    }
}

/// Most uncertain keywords first, remaining slots by descending probability.
fn recommend(
    probabilities: &[f64],
    wrongs: &BTreeSet<KeywordIndex>,
    answer_count: usize,
) -> Vec<KeywordIndex> {
    let open: Vec<KeywordIndex> = (0..probabilities.len())
        .filter(|index| !wrongs.contains(index))
        .collect();

    let mut uncertain: Vec<KeywordIndex> = open
        .iter()
        .copied()
        .filter(|&i| probabilities[i] > UNCERTAIN_BAND.0 && probabilities[i] < UNCERTAIN_BAND.1)
        .collect();
    uncertain.sort_by(|&a, &b| {
        let da = (probabilities[a] - 0.5).abs();
        let db = (probabilities[b] - 0.5).abs();
        da.total_cmp(&db).then(a.cmp(&b))
    });
    let mut guess: Vec<KeywordIndex> = uncertain.into_iter().take(answer_count).collect();

    if guess.len() < answer_count {
        let mut rest: Vec<KeywordIndex> = open
            .into_iter()
            .filter(|index| !guess.contains(index))
            .collect();
        rest.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]).then(a.cmp(&b)));
        let needed = answer_count - guess.len();
        guess.extend(rest.into_iter().take(needed));
    }
    guess.sort_unstable();
    guess
}

/// Depth-first enumeration of combinations with bound pruning.
struct Search<'a> {
    constraints: &'a [Constraint],
    members: Vec<Vec<bool>>,
    /// `suffix[c][p]`: members of constraint `c` among `candidates[p..]`.
    suffix: Vec<Vec<usize>>,
    selected_counts: Vec<usize>,
    selected: Vec<bool>,
    candidates: Vec<KeywordIndex>,
    chosen: Vec<KeywordIndex>,
    solutions: Vec<Vec<KeywordIndex>>,
    truncation: Option<Truncation>,
    nodes: u64,
    max_solutions: usize,
    deadline: Option<Instant>,
}

impl<'a> Search<'a> {
    fn new(
        keyword_count: usize,
        constraints: &'a [Constraint],
        forced: &[KeywordIndex],
        candidates: Vec<KeywordIndex>,
        config: LogicalConfig,
    ) -> Self {
        let members: Vec<Vec<bool>> = constraints
            .iter()
            .map(|constraint| {
                let mut mask = vec![false; keyword_count];
                for &index in &constraint.keywords {
                    if index < keyword_count {
                        mask[index] = true;
                    }
                }
                mask
            })
            .collect();
        let suffix = members
            .iter()
            .map(|mask| {
                let mut counts = vec![0usize; candidates.len() + 1];
                for pos in (0..candidates.len()).rev() {
                    counts[pos] = counts[pos + 1] + usize::from(mask[candidates[pos]]);
                }
                counts
            })
            .collect();

        let mut selected = vec![false; keyword_count];
        for &index in forced {
            selected[index] = true;
        }
        let selected_counts = constraints
            .iter()
            .map(|constraint| constraint.count_selected(&selected))
            .collect();

        Self {
            constraints,
            members,
            suffix,
            selected_counts,
            selected,
            candidates,
            chosen: forced.to_vec(),
            solutions: Vec::new(),
            truncation: None,
            nodes: 0,
            max_solutions: config.max_solutions.max(1),
            deadline: config.timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    /// Whether the current partial assignment can still be completed.
    fn admits(&self, next: usize, slots: usize) -> bool {
        if self.candidates.len() - next < slots {
            return false;
        }
        for (c, constraint) in self.constraints.iter().enumerate() {
            let count = self.selected_counts[c];
            if constraint.upper_bound().is_some_and(|upper| count > upper) {
                return false;
            }
            if let Some(lower) = constraint.lower_bound() {
                let reachable = self.suffix[c][next].min(slots);
                if count + reachable < lower {
                    return false;
                }
            }
        }
        true
    }

    fn toggle(&mut self, index: KeywordIndex, on: bool) {
        self.selected[index] = on;
        for (c, mask) in self.members.iter().enumerate() {
            if mask[index] {
                if on {
                    self.selected_counts[c] += 1;
                } else {
                    self.selected_counts[c] -= 1;
                }
            }
        }
        if on {
            self.chosen.push(index);
        } else {
            self.chosen.pop();
        }
    }

    fn run(&mut self, start: usize, slots: usize) {
        if self.truncation.is_some() {
            return;
        }
        if slots == 0 {
            if self
                .constraints
                .iter()
                .all(|constraint| constraint.is_satisfied(&self.selected))
            {
                // Only a solution beyond the cap proves the enumeration incomplete.
                if self.solutions.len() >= self.max_solutions {
                    self.truncation = Some(Truncation::SolutionCap);
                    return;
                }
                let mut solution = self.chosen.clone();
                solution.sort_unstable();
                self.solutions.push(solution);
            }
            return;
        }

        for pos in start..self.candidates.len() {
            if self.candidates.len() - pos < slots || self.truncation.is_some() {
                break;
            }
            self.nodes += 1;
            if self.nodes % DEADLINE_CHECK_INTERVAL == 0
                && self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
            {
                self.truncation = Some(Truncation::Timeout);
                break;
            }
            let index = self.candidates[pos];
            self.toggle(index, true);
            if self.admits(pos + 1, slots - 1) {
                self.run(pos + 1, slots - 1);
            }
            self.toggle(index, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(hints: &[usize]) -> InferenceContext {
        InferenceContext::new(10, 3)
            .with_hints(hints)
            .with_guess(1, &[1, 4, 9], 2)
            .with_guess(2, &[2, 4, 7], 2)
            .with_guess(1, &[1, 4, 2], 2)
    }

    #[test]
    fn without_hints_two_worlds_remain() {
        let mut engine = LogicalInference::default();
        let result = engine.infer(&scenario(&[]));
        assert_eq!(
            result.candidate_solutions,
            Some(vec![vec![1, 4, 7], vec![2, 4, 9]])
        );
        assert_eq!(result.certain_answers, BTreeSet::from([4]));
        assert!(!result.degraded());
        assert!((result.probability(1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn a_hint_collapses_the_scenario_to_one_solution() {
        let mut engine = LogicalInference::default();
        let result = engine.infer(&scenario(&[9]));
        assert_eq!(result.solution_count(), Some(1));
        assert_eq!(result.certain_answers, BTreeSet::from([1, 4, 7]));
        assert_eq!(result.recommended_guess, vec![1, 4, 7]);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn contradictions_yield_zero_confidence() {
        let mut engine = LogicalInference::default();
        let ctx = InferenceContext::new(6, 2)
            .with_guess(1, &[0, 1], 2)
            .with_guess(1, &[0, 2], 0);
        let result = engine.infer(&ctx);
        assert!(result.is_contradictory());
        assert_eq!(result.confidence, 0.0);
        assert!(result.certain_answers.is_empty() && result.certain_wrongs.is_empty());
    }

    #[test]
    fn solution_cap_degrades_without_enumeration_certainty() {
        let mut engine = LogicalInference::new(LogicalConfig {
            max_solutions: 5,
            timeout: None,
        });
        let ctx = InferenceContext::new(12, 3).with_guess(1, &[0, 1, 2], 0);
        let result = engine.infer(&ctx);
        assert_eq!(result.truncation, Some(Truncation::SolutionCap));
        assert_eq!(result.solution_count(), Some(5));
        assert!(result.certain_answers.is_empty());
        assert_eq!(result.certain_wrongs, BTreeSet::from([0, 1, 2]));
        assert!(result.confidence <= 0.5);
    }

    #[test]
    fn exactly_cap_solutions_is_a_complete_enumeration() {
        let mut engine = LogicalInference::new(LogicalConfig {
            max_solutions: 2,
            timeout: None,
        });
        let result = engine.infer(&scenario(&[]));
        assert_eq!(result.truncation, None);
        assert_eq!(
            result.candidate_solutions,
            Some(vec![vec![1, 4, 7], vec![2, 4, 9]])
        );
        assert_eq!(result.certain_answers, BTreeSet::from([4]));
        assert!(!result.degraded());

        let mut capped = LogicalInference::new(LogicalConfig {
            max_solutions: 1,
            timeout: None,
        });
        let result = capped.infer(&scenario(&[]));
        assert_eq!(result.truncation, Some(Truncation::SolutionCap));
        assert_eq!(result.solution_count(), Some(1));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let mut engine = LogicalInference::default();
        let ctx = scenario(&[]);
        assert_eq!(engine.infer(&ctx), engine.infer(&ctx));
    }

    #[test]
    fn recommendation_targets_uncertain_keywords() {
        let mut engine = LogicalInference::default();
        let result = engine.infer(&scenario(&[]));
        // 1, 2, 7, 9 sit at 0.5; the lowest indices win ties.
        assert_eq!(result.recommended_guess, vec![1, 2, 7]);
    }
}
