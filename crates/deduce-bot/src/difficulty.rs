use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown difficulty '{0}' (expected easy, medium or hard)")]
pub struct ParseDifficultyError(pub String);

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        read("DEDUCE_BOT_DIFFICULTY")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" | "beginner" => Ok(Difficulty::Easy),
            "medium" | "normal" | "default" => Ok(Difficulty::Medium),
            "hard" | "expert" => Ok(Difficulty::Hard),
            _ => Err(ParseDifficultyError(raw.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(" normal ".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert!("legendary".parse::<Difficulty>().is_err());
    }

    #[test]
    fn reader_falls_back_to_default() {
        assert_eq!(
            Difficulty::from_reader(|_| Some("easy".into())),
            Difficulty::Easy
        );
        assert_eq!(
            Difficulty::from_reader(|_| Some("??".into())),
            Difficulty::Medium
        );
        assert_eq!(Difficulty::from_reader(|_| None), Difficulty::Medium);
    }
}
