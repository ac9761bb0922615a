//! DTOs for the remote catalog endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::catalog::RemoteGame;

/// Query parameters of the bounded game search.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Search text.
    pub q: String,
    /// Maximum number of results, clamped server-side.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query parameters of the exhaustive game search.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ExhaustiveParams {
    /// Search text.
    pub q: String,
    /// Maximum number of results, clamped server-side.
    #[serde(default)]
    pub max: Option<usize>,
}

/// Query parameters of the popular-games endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PopularParams {
    /// Maximum number of results, clamped server-side.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of leading results to skip.
    #[serde(default)]
    pub offset: Option<usize>,
    /// Exclude romhacks and extensions when true.
    #[serde(default, rename = "officialOnly")]
    pub official_only: Option<bool>,
}

/// One catalog entry as exposed by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameView {
    /// Remote catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short URL-friendly identifier.
    pub abbreviation: String,
    /// Cover art URI.
    pub cover_uri: Option<String>,
    /// Logo art URI.
    pub logo_uri: Option<String>,
    /// Background art URI.
    pub background_uri: Option<String>,
    /// Platform names.
    pub platforms: Vec<String>,
    /// Genre names.
    pub genres: Vec<String>,
    /// Developer names.
    pub developers: Vec<String>,
    /// Publisher names.
    pub publishers: Vec<String>,
    /// Whether the entry is a romhack or extension.
    pub romhack: bool,
}

impl From<RemoteGame> for GameView {
    fn from(game: RemoteGame) -> Self {
        Self {
            id: game.id,
            name: game.name,
            abbreviation: game.abbreviation,
            cover_uri: game.cover_uri,
            logo_uri: game.logo_uri,
            background_uri: game.background_uri,
            platforms: game.platforms,
            genres: game.genres,
            developers: game.developers,
            publishers: game.publishers,
            romhack: game.romhack,
        }
    }
}

/// Response of every search endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameListResponse {
    /// Matching catalog entries, best first.
    pub games: Vec<GameView>,
}

impl GameListResponse {
    /// Wrap normalized catalog entries into the response payload.
    pub fn from_games(games: Vec<RemoteGame>) -> Self {
        Self {
            games: games.into_iter().map(Into::into).collect(),
        }
    }
}
