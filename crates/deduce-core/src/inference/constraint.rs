use super::InferenceContext;
use crate::model::KeywordIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Exact,
    AtLeast,
    AtMost,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSource {
    Cardinality,
    OwnHint,
    OtherHint,
    RevealedAnswer,
    RevealedWrong,
    Guess { index: usize },
    GuessCount { index: usize },
    SingleSwap { first: usize, second: usize },
    External,
}

/// Bound on how many of `keywords` belong to the answer set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub keywords: Vec<KeywordIndex>,
    pub value: usize,
    pub source: Option<ConstraintSource>,
}

impl Constraint {
    fn build(kind: ConstraintKind, keywords: &[KeywordIndex], value: usize) -> Self {
        let mut keywords = keywords.to_vec();
        keywords.sort_unstable();
        keywords.dedup();
        Self {
            kind,
            keywords,
            value,
            source: None,
        }
    }

    pub fn exact(keywords: &[KeywordIndex], value: usize) -> Self {
        Self::build(ConstraintKind::Exact, keywords, value)
    }

    pub fn at_least(keywords: &[KeywordIndex], value: usize) -> Self {
        Self::build(ConstraintKind::AtLeast, keywords, value)
    }

    pub fn at_most(keywords: &[KeywordIndex], value: usize) -> Self {
        Self::build(ConstraintKind::AtMost, keywords, value)
    }

    pub fn not_in(keywords: &[KeywordIndex]) -> Self {
        Self::build(ConstraintKind::NotIn, keywords, 0)
    }

    pub fn with_source(mut self, source: ConstraintSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Largest number of selected members this constraint allows.
    pub fn upper_bound(&self) -> Option<usize> {
        match self.kind {
            ConstraintKind::Exact | ConstraintKind::AtMost => Some(self.value),
            ConstraintKind::NotIn => Some(0),
            ConstraintKind::AtLeast => None,
        }
    }

    /// Smallest number of selected members this constraint requires.
    pub fn lower_bound(&self) -> Option<usize> {
        match self.kind {
            ConstraintKind::Exact | ConstraintKind::AtLeast => Some(self.value),
            ConstraintKind::AtMost | ConstraintKind::NotIn => None,
        }
    }

    pub fn count_selected(&self, selected: &[bool]) -> usize {
        self.keywords
            .iter()
            .filter(|&&index| selected.get(index).copied().unwrap_or(false))
            .count()
    }

    /// Checks a complete assignment.
    pub fn is_satisfied(&self, selected: &[bool]) -> bool {
        let count = self.count_selected(selected);
        match self.kind {
            ConstraintKind::Exact => count == self.value,
            ConstraintKind::AtLeast => count >= self.value,
            ConstraintKind::AtMost => count <= self.value,
            ConstraintKind::NotIn => count == 0,
        }
    }
}

/// Keywords whose status follows from the constraints without search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deductions {
    pub answers: BTreeSet<KeywordIndex>,
    pub wrongs: BTreeSet<KeywordIndex>,
    pub contradictory: bool,
    /// Pins found by propagation, in discovery order.
    pub pinned: Vec<(KeywordIndex, bool, ConstraintSource)>,
}

impl Deductions {
    fn mark(&mut self, index: KeywordIndex, is_answer: bool, source: ConstraintSource) -> bool {
        let (target, opposite) = if is_answer {
            (&mut self.answers, &self.wrongs)
        } else {
            (&mut self.wrongs, &self.answers)
        };
        if opposite.contains(&index) {
            self.contradictory = true;
            return false;
        }
        if target.insert(index) {
            self.pinned.push((index, is_answer, source));
            true
        } else {
            false
        }
    }

    pub fn is_known(&self, index: KeywordIndex) -> bool {
        self.answers.contains(&index) || self.wrongs.contains(&index)
    }
}

/// Propagates hints, reveals and guess counts to a fixed point.
pub fn deduce_known(ctx: &InferenceContext) -> Deductions {
    let mut known = Deductions::default();
    known.wrongs.extend(ctx.own_hints.iter().copied());
    known.wrongs.extend(ctx.other_hints.iter().copied());
    known.wrongs.extend(ctx.revealed_wrongs.iter().copied());
    for constraint in &ctx.extra_constraints {
        if constraint.kind == ConstraintKind::NotIn {
            known.wrongs.extend(constraint.keywords.iter().copied());
        }
    }
    known.answers.extend(ctx.revealed_answers.iter().copied());
    if known.answers.intersection(&known.wrongs).next().is_some() {
        known.contradictory = true;
        return known;
    }

    let history = &ctx.history;
    for _ in 0..=ctx.keyword_count {
        let mut changed = false;

        for (index, guess) in history.iter().enumerate() {
            let source = ConstraintSource::GuessCount { index };
            let known_in = guess
                .guessed
                .iter()
                .filter(|k| known.answers.contains(k))
                .count();
            let unknown: Vec<KeywordIndex> = guess
                .guessed
                .iter()
                .copied()
                .filter(|&k| !known.is_known(k))
                .collect();
            if known_in > guess.correct_count || known_in + unknown.len() < guess.correct_count {
                known.contradictory = true;
                break;
            }
            if unknown.is_empty() {
                continue;
            }
            let as_answer = if known_in == guess.correct_count {
                false
            } else if known_in + unknown.len() == guess.correct_count {
                true
            } else {
                continue;
            };
            for k in unknown {
                changed |= known.mark(k, as_answer, source);
            }
        }

        for first in 0..history.len() {
            for second in (first + 1)..history.len() {
                let a = &history[first];
                let b = &history[second];
                if a.guessed.len() != b.guessed.len() {
                    continue;
                }
                let only_a: Vec<KeywordIndex> =
                    a.guessed.iter().copied().filter(|k| !b.contains(*k)).collect();
                let only_b: Vec<KeywordIndex> =
                    b.guessed.iter().copied().filter(|k| !a.contains(*k)).collect();
                if only_a.len() != 1 || only_b.len() != 1 {
                    continue;
                }
                let (x, y) = (only_a[0], only_b[0]);
                let source = ConstraintSource::SingleSwap { first, second };
                let delta = b.correct_count as i64 - a.correct_count as i64;
                match delta {
                    1 => {
                        changed |= known.mark(y, true, source);
                        changed |= known.mark(x, false, source);
                    }
                    -1 => {
                        changed |= known.mark(x, true, source);
                        changed |= known.mark(y, false, source);
                    }
                    0 => {
                        // Swapped pair shares its status.
                        if let Some(status) = status_of(&known, x) {
                            changed |= known.mark(y, status, source);
                        } else if let Some(status) = status_of(&known, y) {
                            changed |= known.mark(x, status, source);
                        }
                    }
                    _ => known.contradictory = true,
                }
            }
        }

        if known.answers.len() > ctx.answer_count
            || ctx.keyword_count - known.wrongs.len().min(ctx.keyword_count) < ctx.answer_count
        {
            known.contradictory = true;
        }
        if known.contradictory {
            break;
        }
        if known.answers.len() == ctx.answer_count || known.wrongs.len() + ctx.answer_count == ctx.keyword_count {
            let fill_answers = known.answers.len() < ctx.answer_count;
            for k in 0..ctx.keyword_count {
                if !known.is_known(k) {
                    changed |= known.mark(k, fill_answers, ConstraintSource::Cardinality);
                }
            }
        }

        if !changed || known.contradictory {
            break;
        }
    }

    known
}

fn status_of(known: &Deductions, index: KeywordIndex) -> Option<bool> {
    if known.answers.contains(&index) {
        Some(true)
    } else if known.wrongs.contains(&index) {
        Some(false)
    } else {
        None
    }
}

/// Constraint set handed to the solver, together with the propagated pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSet {
    pub constraints: Vec<Constraint>,
    pub deductions: Deductions,
}

pub fn derive_constraints(ctx: &InferenceContext) -> ConstraintSet {
    let all: Vec<KeywordIndex> = (0..ctx.keyword_count).collect();
    let mut constraints =
        vec![Constraint::exact(&all, ctx.answer_count).with_source(ConstraintSource::Cardinality)];

    let groups = [
        (&ctx.own_hints, ConstraintSource::OwnHint),
        (&ctx.revealed_wrongs, ConstraintSource::RevealedWrong),
        (&ctx.other_hints, ConstraintSource::OtherHint),
    ];
    for (set, source) in groups {
        if !set.is_empty() {
            let keywords: Vec<KeywordIndex> = set.iter().copied().collect();
            constraints.push(Constraint::not_in(&keywords).with_source(source));
        }
    }
    for &index in &ctx.revealed_answers {
        constraints.push(Constraint::exact(&[index], 1).with_source(ConstraintSource::RevealedAnswer));
    }
    for (index, guess) in ctx.history.iter().enumerate() {
        constraints.push(
            Constraint::exact(&guess.guessed, guess.correct_count)
                .with_source(ConstraintSource::Guess { index }),
        );
    }

    let deductions = deduce_known(ctx);
    for &(index, is_answer, source) in &deductions.pinned {
        let pin = if is_answer {
            Constraint::exact(&[index], 1)
        } else {
            Constraint::not_in(&[index])
        };
        constraints.push(pin.with_source(source));
    }
    for extra in &ctx.extra_constraints {
        let mut extra = extra.clone();
        extra.source.get_or_insert(ConstraintSource::External);
        constraints.push(extra);
    }

    ConstraintSet {
        constraints,
        deductions,
    }
}
