//! Gradual sharing of other players' hints with built-in AI players.

use deduce_bot::Difficulty;

const EXPECTED_TURNS_FACTOR: f64 = 1.5;
const EXPECTED_TURNS_BASE: f64 = 10.0;
const MAX_TURNS_SHARE: f64 = 0.8;

/// Expected game length from pool size, capped at 80% of `max_turns`.
pub fn expected_turns(keyword_count: usize, answer_count: usize, max_turns: Option<u32>) -> f64 {
    let answers = answer_count.max(1) as f64;
    let complexity = keyword_count.saturating_sub(answer_count) as f64 / answers;
    let base = (complexity * EXPECTED_TURNS_FACTOR + EXPECTED_TURNS_BASE).ceil();
    match max_turns {
        Some(max) => base.min(max as f64 * MAX_TURNS_SHARE),
        None => base,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealSchedule {
    pub start_ratio: f64,
    pub initial_interval: f64,
    pub acceleration: f64,
    /// Hints shared per reveal grow with elapsed turns times this.
    pub batch_growth: f64,
}

impl RevealSchedule {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                start_ratio: 0.5,
                initial_interval: 8.0,
                acceleration: 1.2,
                batch_growth: 0.15,
            },
            Difficulty::Medium => Self {
                start_ratio: 0.25,
                initial_interval: 4.0,
                acceleration: 1.5,
                batch_growth: 0.3,
            },
            Difficulty::Hard => Self {
                start_ratio: 0.05,
                initial_interval: 1.0,
                acceleration: 8.0,
                batch_growth: 1.5,
            },
        }
    }
}

/// Tracks when one player last learned something.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealPlan {
    schedule: RevealSchedule,
    start_turn: u32,
    last_reveal: Option<u32>,
}

impl RevealPlan {
    pub fn new(schedule: RevealSchedule, expected_turns: f64) -> Self {
        let start_turn = ((expected_turns * schedule.start_ratio).floor() as u32).max(1);
        Self {
            schedule,
            start_turn,
            last_reveal: None,
        }
    }

    pub fn start_turn(&self) -> u32 {
        self.start_turn
    }

    /// Gap between reveals at `turn`, shrinking as the game goes on.
    pub fn interval(&self, turn: u32) -> u32 {
        let elapsed = turn.saturating_sub(self.start_turn) as f64;
        let scale = 10.0 / self.schedule.acceleration;
        ((self.schedule.initial_interval / (1.0 + elapsed / scale)).floor() as u32).max(1)
    }

    /// How many hints to share before this player's move at `turn`; records
    /// the reveal when non-zero.
    pub fn due(&mut self, turn: u32) -> usize {
        if turn < self.start_turn {
            return 0;
        }
        let last = self.last_reveal.unwrap_or(self.start_turn - 1);
        if turn < last + self.interval(turn) {
            return 0;
        }
        self.last_reveal = Some(turn);
        let elapsed = (turn - self.start_turn) as f64;
        ((elapsed * self.schedule.batch_growth).floor() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_turns_respects_cap() {
        // (30 - 3) / 3 * 1.5 + 10 = 23.5 -> 24
        assert_eq!(expected_turns(30, 3, None), 24.0);
        assert_eq!(expected_turns(30, 3, Some(20)), 16.0);
    }

    #[test]
    fn easy_waits_longer_than_hard() {
        let expected = 24.0;
        let easy = RevealPlan::new(RevealSchedule::for_difficulty(Difficulty::Easy), expected);
        let hard = RevealPlan::new(RevealSchedule::for_difficulty(Difficulty::Hard), expected);
        assert_eq!(easy.start_turn(), 12);
        assert_eq!(hard.start_turn(), 1);
    }

    #[test]
    fn reveals_follow_interval() {
        let mut plan = RevealPlan::new(RevealSchedule::for_difficulty(Difficulty::Medium), 24.0);
        assert_eq!(plan.start_turn(), 6);
        assert_eq!(plan.due(5), 0);
        // Interval at turn 6 is 4: the first reveal waits until start - 1 + 4.
        assert_eq!(plan.due(6), 0);
        assert_eq!(plan.due(9), 1);
        assert_eq!(plan.due(10), 0);
        assert!(plan.due(40) >= 1);
    }

    #[test]
    fn hard_reveals_every_turn() {
        let mut plan = RevealPlan::new(RevealSchedule::for_difficulty(Difficulty::Hard), 24.0);
        for turn in 1..6 {
            assert!(plan.due(turn) >= 1, "turn {turn}");
        }
    }
}
