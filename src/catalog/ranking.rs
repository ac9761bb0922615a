//! Ordered ranking stages for aggregated catalog results.
//!
//! Each rank is an explicit struct of named stage values compared
//! lexicographically, so every stage can be tested on its own and the
//! combined comparator is a strict weak ordering by construction.

use std::cmp::Ordering;

use crate::catalog::models::RemoteGame;

/// Relevance key for free-text search results.
///
/// Stage order: official releases before romhacks, exact name matches
/// first, more matched query words first, prefix matches first, higher
/// link count first, then alphabetical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRank {
    /// Entry is a romhack/extension (sorted after official releases).
    pub romhack: bool,
    /// Name equals the query, case-insensitively.
    pub exact: bool,
    /// How many query words appear in the name.
    pub matched_words: usize,
    /// Name starts with the query, case-insensitively.
    pub prefix: bool,
    /// Related-link count, the popularity proxy.
    pub link_count: usize,
    /// Lowercased name for the alphabetical tiebreak.
    pub name_key: String,
}

impl SearchRank {
    /// Score one game against the original query.
    pub fn score(game: &RemoteGame, query: &str) -> Self {
        let name = game.name.to_lowercase();
        let query = query.trim().to_lowercase();

        let matched_words = query
            .split_whitespace()
            .filter(|word| name.contains(word))
            .count();

        Self {
            romhack: game.romhack,
            exact: name == query,
            matched_words,
            prefix: !query.is_empty() && name.starts_with(&query),
            link_count: game.link_count,
            name_key: name,
        }
    }
}

impl Ord for SearchRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.romhack
            .cmp(&other.romhack)
            .then_with(|| other.exact.cmp(&self.exact))
            .then_with(|| other.matched_words.cmp(&self.matched_words))
            .then_with(|| other.prefix.cmp(&self.prefix))
            .then_with(|| other.link_count.cmp(&self.link_count))
            .then_with(|| self.name_key.cmp(&other.name_key))
    }
}

impl PartialOrd for SearchRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Popularity key for the browse listing.
///
/// Stage order: higher link count, more platforms, more genres, then
/// alphabetical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularityRank {
    /// Related-link count.
    pub link_count: usize,
    /// Number of platforms the game was released on.
    pub platform_count: usize,
    /// Number of genres.
    pub genre_count: usize,
    /// Lowercased name for the alphabetical tiebreak.
    pub name_key: String,
}

impl PopularityRank {
    /// Score one game for the popularity listing.
    pub fn score(game: &RemoteGame) -> Self {
        Self {
            link_count: game.link_count,
            platform_count: game.platforms.len(),
            genre_count: game.genres.len(),
            name_key: game.name.to_lowercase(),
        }
    }
}

impl Ord for PopularityRank {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .link_count
            .cmp(&self.link_count)
            .then_with(|| other.platform_count.cmp(&self.platform_count))
            .then_with(|| other.genre_count.cmp(&self.genre_count))
            .then_with(|| self.name_key.cmp(&other.name_key))
    }
}

impl PartialOrd for PopularityRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(name: &str, romhack: bool, links: usize) -> RemoteGame {
        RemoteGame {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            abbreviation: String::new(),
            cover_uri: None,
            logo_uri: None,
            background_uri: None,
            platforms: Vec::new(),
            genres: Vec::new(),
            developers: Vec::new(),
            publishers: Vec::new(),
            link_count: links,
            romhack,
        }
    }

    #[test]
    fn official_releases_come_before_romhacks() {
        let official = SearchRank::score(&game("Super Mario 64", false, 1), "mario");
        let hack = SearchRank::score(&game("Super Mario 64 Chaos Edition", true, 50), "mario");
        assert!(official < hack);
    }

    #[test]
    fn exact_match_beats_popularity() {
        let exact = SearchRank::score(&game("Celeste", false, 2), "celeste");
        let popular = SearchRank::score(&game("Celeste Classic", false, 90), "celeste");
        assert!(exact < popular);
    }

    #[test]
    fn more_matched_words_rank_higher() {
        let both = SearchRank::score(&game("The Legend of Zelda", false, 5), "legend zelda");
        let one = SearchRank::score(&game("Zelda II", false, 5), "legend zelda");
        assert!(both < one);
    }

    #[test]
    fn prefix_beats_plain_containment() {
        let prefix = SearchRank::score(&game("Zelda II", false, 5), "zelda");
        let infix = SearchRank::score(&game("BS Zelda", false, 5), "zelda");
        assert!(prefix < infix);
    }

    #[test]
    fn alphabetical_tiebreak_is_last() {
        let a = SearchRank::score(&game("Sonic Adventure", false, 5), "sonic");
        let b = SearchRank::score(&game("Sonic Adventure 2", false, 5), "sonic");
        assert!(a < b);
    }

    #[test]
    fn search_sort_is_idempotent() {
        let mut games = vec![
            game("BS Zelda", false, 3),
            game("Zelda II", false, 40),
            game("The Legend of Zelda", false, 80),
            game("Zelda Romhack", true, 100),
            game("zelda", false, 1),
        ];
        games.sort_by_key(|g| SearchRank::score(g, "zelda"));
        let once: Vec<String> = games.iter().map(|g| g.name.clone()).collect();
        games.sort_by_key(|g| SearchRank::score(g, "zelda"));
        let twice: Vec<String> = games.iter().map(|g| g.name.clone()).collect();
        assert_eq!(once, twice);
        assert_eq!(once.first().map(String::as_str), Some("zelda"));
        assert_eq!(once.last().map(String::as_str), Some("Zelda Romhack"));
    }

    #[test]
    fn popularity_orders_by_links_then_breadth() {
        let mut a = game("Alpha", false, 10);
        a.platforms = vec!["PC".into()];
        let mut b = game("Beta", false, 10);
        b.platforms = vec!["PC".into(), "Switch".into()];
        let c = game("Gamma", false, 30);

        let mut games = vec![a, b, c];
        games.sort_by_key(PopularityRank::score);
        let names: Vec<&str> = games.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Alpha"]);
    }
}
