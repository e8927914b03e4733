use std::collections::BTreeMap;

use deduce_core::{KeywordIndex, PlayerId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::GamesConfig;

const WORDS: &[&str] = &[
    "anchor", "apple", "arrow", "badge", "banana", "barrel", "beacon", "bridge", "candle",
    "canyon", "castle", "cherry", "cloud", "comet", "compass", "coral", "desert", "dragon",
    "engine", "falcon", "feather", "forest", "galaxy", "garden", "glacier", "grape", "harbor",
    "hammer", "island", "jungle", "kettle", "ladder", "lantern", "lemon", "magnet", "mango",
    "marble", "meadow", "mirror", "mountain", "needle", "ocean", "orange", "orchid", "palace",
    "peach", "pepper", "pillow", "planet", "plum", "pocket", "quartz", "rabbit", "river",
    "rocket", "saddle", "shadow", "spiral", "summit", "thunder", "tunnel", "velvet", "violin",
    "walnut", "window", "wizard",
];

/// One generated game: keyword pool, answer set and per-player hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDeal {
    pub keywords: Vec<String>,
    pub answers: Vec<KeywordIndex>,
    pub hints: BTreeMap<PlayerId, Vec<KeywordIndex>>,
}

/// Deals a game from `seed`. Hints never overlap answers or each other.
pub fn deal_game(games: &GamesConfig, players: &[PlayerId], seed: u64) -> GameDeal {
    let mut rng = StdRng::seed_from_u64(seed);
    let keywords = keyword_pool(games.keyword_pool, &mut rng);

    let mut order: Vec<KeywordIndex> = (0..keywords.len()).collect();
    order.shuffle(&mut rng);
    let mut remaining = order.into_iter();

    let mut answers: Vec<KeywordIndex> = remaining.by_ref().take(games.answer_count).collect();
    answers.sort_unstable();

    let mut hints = BTreeMap::new();
    for &player_id in players {
        let mut own: Vec<KeywordIndex> =
            remaining.by_ref().take(games.hints_per_player).collect();
        own.sort_unstable();
        hints.insert(player_id, own);
    }

    GameDeal {
        keywords,
        answers,
        hints,
    }
}

/// Samples `size` distinct words. Pools larger than the word list reuse words
/// with a numeric suffix.
fn keyword_pool(size: usize, rng: &mut StdRng) -> Vec<String> {
    let mut words: Vec<String> = Vec::with_capacity(size);
    let mut round = 0usize;
    while words.len() < size {
        let mut batch: Vec<&str> = WORDS.to_vec();
        batch.shuffle(rng);
        let take = (size - words.len()).min(batch.len());
        words.extend(batch.into_iter().take(take).map(|word| {
            if round == 0 {
                word.to_string()
            } else {
                format!("{word}-{round}")
            }
        }));
        round += 1;
    }
    words
}
