use deduce_core::{KeywordIndex, PlayerView};
use rhai::Dynamic;

/// Why a script return value could not be used at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Malformed {
    NotAnArray(String),
    NotAnInteger(String),
}

impl std::fmt::Display for Malformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Malformed::NotAnArray(found) => write!(f, "expected an array, got {found}"),
            Malformed::NotAnInteger(found) => write!(f, "array element is {found}, not an integer"),
        }
    }
}

pub(crate) fn raw_indices(value: Dynamic) -> Result<Vec<i64>, Malformed> {
    let type_name = value.type_name().to_string();
    let array = value
        .try_cast::<rhai::Array>()
        .ok_or(Malformed::NotAnArray(type_name))?;
    array
        .into_iter()
        .map(|item| {
            if let Ok(int) = item.as_int() {
                return Ok(int);
            }
            match item.as_float() {
                Ok(float) if float.fract() == 0.0 => Ok(float as i64),
                _ => Err(Malformed::NotAnInteger(item.type_name().to_string())),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sanitized {
    pub guess: Vec<KeywordIndex>,
    pub dropped: usize,
    pub padded: usize,
}

/// Filters out-of-range, own-hint and repeated indices, then pads in a fixed
/// order: revealed answers, remaining candidates ascending, any non-hint.
pub fn sanitize_guess(raw: &[i64], view: &PlayerView) -> Sanitized {
    let needed = view.answer_count;
    let keyword_count = view.keyword_count();
    let mut guess: Vec<KeywordIndex> = Vec::with_capacity(needed);
    let mut dropped = 0;
    for &value in raw {
        let usable = usize::try_from(value)
            .ok()
            .filter(|&index| index < keyword_count && !view.my_hints.contains(&index));
        match usable {
            Some(index) if !guess.contains(&index) && guess.len() < needed => guess.push(index),
            _ => dropped += 1,
        }
    }

    let kept = guess.len();
    let padding = view
        .revealed_answers
        .iter()
        .copied()
        .chain(view.candidate_indices())
        .chain(0..keyword_count);
    for index in padding {
        if guess.len() >= needed {
            break;
        }
        if index < keyword_count && !view.my_hints.contains(&index) && !guess.contains(&index) {
            guess.push(index);
        }
    }
    guess.sort_unstable();
    Sanitized {
        padded: guess.len() - kept,
        guess,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_view;

    #[test]
    fn drops_invalid_and_pads_from_reveals() {
        let mut view = sample_view();
        view.revealed_answers.insert(6);
        let out = sanitize_guess(&[0, 0, 1, -4, 99], &view);
        // 1 is an own hint; 0 repeats.
        assert_eq!(out.guess, vec![0, 2, 6]);
        assert_eq!(out.dropped, 4);
        assert_eq!(out.padded, 2);
    }

    #[test]
    fn full_valid_guess_is_kept() {
        let view = sample_view();
        let out = sanitize_guess(&[8, 2, 0], &view);
        assert_eq!(out.guess, vec![0, 2, 8]);
        assert_eq!(out, Sanitized { guess: vec![0, 2, 8], dropped: 0, padded: 0 });
    }

    #[test]
    fn rejects_non_arrays() {
        assert!(matches!(raw_indices(Dynamic::from(3_i64)), Err(Malformed::NotAnArray(_))));
        let mixed: rhai::Array = vec![Dynamic::from(1_i64), Dynamic::from("x".to_string())];
        assert!(matches!(
            raw_indices(Dynamic::from_array(mixed)),
            Err(Malformed::NotAnInteger(_))
        ));
    }
}
