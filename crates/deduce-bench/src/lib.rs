//! Seeded tournament harness: plays configured agents against each other and
//! writes per-turn JSONL rows plus a Markdown summary.

pub mod config;
pub mod generator;
pub mod logging;
pub mod report;
pub mod tournament;
