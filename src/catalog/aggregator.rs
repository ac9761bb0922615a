//! Multi-variant catalog aggregation.
//!
//! A request fans out into several remote queries (query variants and
//! pagination pages for search, independent strategies for the popularity
//! listing), merges everything into one map keyed by remote identifier,
//! and ranks the merged set. Remote failures are logged and skipped; the
//! request only fails when every strategy failed and nothing was
//! collected.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::catalog::client::{CatalogClient, CatalogError, CatalogResult, GamesOrder};
use crate::catalog::models::{RawGame, RemoteGame};
use crate::catalog::ranking::{PopularityRank, SearchRank};

/// Canonical titles injected for recognized franchise keywords. Searching
/// the remote for "zelda" alone misses entries that spell the full title,
/// so each keyword fans out into known phrasings.
const FRANCHISES: &[(&str, &[&str])] = &[
    (
        "zelda",
        &[
            "The Legend of Zelda",
            "Zelda II: The Adventure of Link",
            "The Legend of Zelda: A Link to the Past",
            "The Legend of Zelda: Ocarina of Time",
            "The Legend of Zelda: Majora's Mask",
            "The Legend of Zelda: The Wind Waker",
            "The Legend of Zelda: Twilight Princess",
            "The Legend of Zelda: Breath of the Wild",
        ],
    ),
    (
        "mario",
        &[
            "Super Mario Bros.",
            "Super Mario 64",
            "Super Mario World",
            "Super Mario Sunshine",
            "Super Mario Galaxy",
            "Super Mario Odyssey",
        ],
    ),
    (
        "sonic",
        &[
            "Sonic the Hedgehog",
            "Sonic Adventure",
            "Sonic Adventure 2",
            "Sonic Mania",
        ],
    ),
    (
        "metroid",
        &["Metroid", "Super Metroid", "Metroid Prime", "Metroid Dread"],
    ),
    (
        "pokemon",
        &[
            "Pokemon Red/Blue",
            "Pokemon Yellow",
            "Pokemon Gold/Silver",
            "Pokemon Emerald",
        ],
    ),
];

/// Fixed list of titles looked up directly by the popularity listing, so
/// the browse page always carries the community's staples even when the
/// remote sort orders surface noise.
const WELL_KNOWN_TITLES: &[&str] = &[
    "Super Mario 64",
    "The Legend of Zelda: Ocarina of Time",
    "Super Metroid",
    "Celeste",
    "Hollow Knight",
    "Portal",
    "Minecraft: Java Edition",
];

/// Tuning knobs for the aggregator, sourced from the application config.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Page size requested from the remote (capped at 200 by the remote).
    pub page_size: u32,
    /// Pause between successive outbound requests, to stay under the
    /// remote's rate limit. Not a correctness synchronization point.
    pub request_delay: Duration,
    /// Collection cap for the plain search endpoint.
    pub search_budget: usize,
    /// Collection cap for the exhaustive search endpoint.
    pub exhaustive_budget: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            page_size: 200,
            request_delay: Duration::from_millis(150),
            search_budget: 100,
            exhaustive_budget: 500,
        }
    }
}

/// Fans queries out against the remote catalog and merges ranked results.
#[derive(Clone)]
pub struct CatalogAggregator {
    client: CatalogClient,
    settings: AggregatorSettings,
}

impl CatalogAggregator {
    /// Build an aggregator around a catalog client.
    pub fn new(client: CatalogClient, settings: AggregatorSettings) -> Self {
        Self { client, settings }
    }

    /// Search the catalog across query variants and pages, returning up to
    /// `limit` results ranked by relevance. Degrades to whatever was
    /// collected when variants fail; an empty result is a valid answer.
    pub async fn search(&self, query: &str, limit: usize, exhaustive: bool) -> Vec<RemoteGame> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let budget = if exhaustive {
            self.settings.exhaustive_budget
        } else {
            self.settings.search_budget
        };

        let mut merged: IndexMap<String, RemoteGame> = IndexMap::new();

        for variant in expand_query(query) {
            if merged.len() >= budget {
                break;
            }
            if let Err(err) = self
                .collect_variant(&mut merged, query, &variant, budget)
                .await
            {
                warn!(%variant, error = %err, "search variant failed; continuing");
            }
        }

        let mut results: Vec<RemoteGame> = merged.into_values().collect();
        results.sort_by_key(|game| SearchRank::score(game, query));
        results.truncate(limit);
        results
    }

    /// Browse the most popular catalog entries.
    ///
    /// Runs the strategy sequence (similarity sort, creation-date sort,
    /// well-known title lookups, unsorted fallback), merges, ranks by the
    /// popularity stages, and windows by `offset`/`limit`. Fails only when
    /// every strategy failed and nothing was collected.
    pub async fn popular(
        &self,
        limit: usize,
        offset: usize,
        official_only: bool,
    ) -> CatalogResult<Vec<RemoteGame>> {
        let needed = offset.saturating_add(limit);
        let mut merged: IndexMap<String, RemoteGame> = IndexMap::new();
        let mut any_success = false;

        for order in [GamesOrder::Similarity, GamesOrder::CreatedDesc] {
            match self
                .client
                .games_ordered(order, self.settings.page_size, 0)
                .await
            {
                Ok(page) => {
                    any_success = true;
                    absorb(&mut merged, page, None);
                }
                Err(err) => warn!(?order, error = %err, "popular strategy failed; continuing"),
            }
            sleep(self.settings.request_delay).await;
        }

        for title in WELL_KNOWN_TITLES {
            match self.client.games_by_name(title, 5, 0).await {
                Ok(page) => {
                    any_success = true;
                    absorb(&mut merged, page, None);
                }
                Err(err) => warn!(title, error = %err, "well-known lookup failed; continuing"),
            }
            sleep(self.settings.request_delay).await;
        }

        if merged.len() < needed {
            match self
                .client
                .games_unsorted(self.settings.page_size, 0)
                .await
            {
                Ok(page) => {
                    any_success = true;
                    absorb(&mut merged, page, None);
                }
                Err(err) => warn!(error = %err, "unsorted fallback failed"),
            }
        }

        if !any_success && merged.is_empty() {
            return Err(CatalogError::Exhausted);
        }

        let mut results: Vec<RemoteGame> = merged.into_values().collect();
        if official_only {
            results.retain(|game| !game.romhack);
        }
        results.sort_by_key(PopularityRank::score);
        Ok(results.into_iter().skip(offset).take(limit).collect())
    }

    /// Page through one query variant until a short page or the collection
    /// budget is reached.
    async fn collect_variant(
        &self,
        merged: &mut IndexMap<String, RemoteGame>,
        query: &str,
        variant: &str,
        budget: usize,
    ) -> CatalogResult<()> {
        let page_size = self.settings.page_size;
        let mut offset = 0u32;

        loop {
            let page = self.client.games_by_name(variant, page_size, offset).await?;
            let page_len = page.len();
            absorb(merged, page, Some((query, variant)));
            debug!(%variant, offset, page_len, merged = merged.len(), "absorbed search page");

            offset += page_len as u32;
            if page_len < page_size as usize || merged.len() >= budget {
                return Ok(());
            }
            sleep(self.settings.request_delay).await;
        }
    }
}

/// Expand a query into the variants actually sent to the remote: the
/// literal query first, then canonical titles for any recognized
/// franchise keyword it contains.
fn expand_query(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut variants = vec![query.to_string()];

    for (keyword, titles) in FRANCHISES {
        if lowered.contains(keyword) {
            for title in *titles {
                if !variants.iter().any(|existing| existing == title) {
                    variants.push((*title).to_string());
                }
            }
        }
    }

    variants
}

/// Normalize and merge raw records into the deduplication map. With a
/// filter, a record is accepted only when its name or abbreviation
/// contains the original query or the variant that produced it.
fn absorb(
    merged: &mut IndexMap<String, RemoteGame>,
    page: Vec<RawGame>,
    filter: Option<(&str, &str)>,
) {
    for raw in page {
        let Some(game) = raw.normalize() else {
            continue;
        };

        if let Some((query, variant)) = filter
            && !matches_query(&game, query, variant)
        {
            continue;
        }

        merged.insert(game.id.clone(), game);
    }
}

/// Case-insensitive containment check against the original query and the
/// variant term.
fn matches_query(game: &RemoteGame, query: &str, variant: &str) -> bool {
    let name = game.name.to_lowercase();
    let abbreviation = game.abbreviation.to_lowercase();
    let query = query.to_lowercase();
    let variant = variant.to_lowercase();

    name.contains(&query)
        || abbreviation.contains(&query)
        || name.contains(&variant)
        || abbreviation.contains(&variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(id: &str, name: &str) -> RawGame {
        serde_json::from_value(json!({
            "id": id,
            "names": {"international": name},
            "abbreviation": name.to_lowercase().replace(' ', ""),
        }))
        .unwrap()
    }

    #[test]
    fn literal_query_is_always_the_first_variant() {
        let variants = expand_query("ZeLdA randomizer");
        assert_eq!(variants[0], "ZeLdA randomizer");
        assert!(variants.iter().any(|v| v == "The Legend of Zelda"));
    }

    #[test]
    fn unrecognized_queries_stay_literal() {
        assert_eq!(expand_query("celeste"), vec!["celeste".to_string()]);
    }

    #[test]
    fn absorb_deduplicates_by_remote_id() {
        let mut merged = IndexMap::new();
        absorb(
            &mut merged,
            vec![raw("g1", "Zelda II"), raw("g2", "BS Zelda")],
            Some(("zelda", "zelda")),
        );
        absorb(
            &mut merged,
            vec![raw("g1", "Zelda II"), raw("g3", "The Legend of Zelda")],
            Some(("zelda", "The Legend of Zelda")),
        );
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn absorb_rejects_records_matching_neither_query_nor_variant() {
        let mut merged = IndexMap::new();
        absorb(
            &mut merged,
            vec![raw("g1", "Celeste"), raw("g2", "Zelda II")],
            Some(("zelda", "zelda")),
        );
        assert_eq!(merged.len(), 1);
        assert!(merged.contains_key("g2"));
    }

    #[test]
    fn variant_match_is_enough_when_the_query_is_absent() {
        // "The Legend of Zelda" contains the variant term even though a
        // record found through it may not contain the literal query.
        let mut merged = IndexMap::new();
        absorb(
            &mut merged,
            vec![raw("g1", "The Legend of Link")],
            Some(("zelda", "The Legend of Link")),
        );
        assert_eq!(merged.len(), 1);
    }
}
