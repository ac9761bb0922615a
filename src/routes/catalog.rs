use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::catalog::{ExhaustiveParams, GameListResponse, PopularParams, SearchParams},
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Routes proxying the remote speedrun catalog.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/speedrun/games/search", get(search_games))
        .route("/speedrun/games/search/exhaustive", get(search_games_exhaustive))
        .route("/speedrun/games/popular", get(popular_games))
}

/// Bounded catalog search ranked by relevance.
#[utoipa::path(
    get,
    path = "/speedrun/games/search",
    tag = "catalog",
    params(SearchParams),
    responses(
        (status = 200, description = "Ranked matches", body = GameListResponse),
        (status = 400, description = "Blank query")
    )
)]
pub async fn search_games(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<GameListResponse>, AppError> {
    let games = catalog_service::search_games(&state, &params.q, params.limit).await?;
    Ok(Json(GameListResponse::from_games(games)))
}

/// Exhaustive catalog search with a larger collection budget.
#[utoipa::path(
    get,
    path = "/speedrun/games/search/exhaustive",
    tag = "catalog",
    params(ExhaustiveParams),
    responses(
        (status = 200, description = "Ranked matches", body = GameListResponse),
        (status = 400, description = "Blank query")
    )
)]
pub async fn search_games_exhaustive(
    State(state): State<SharedState>,
    Query(params): Query<ExhaustiveParams>,
) -> Result<Json<GameListResponse>, AppError> {
    let games = catalog_service::search_games_exhaustive(&state, &params.q, params.max).await?;
    Ok(Json(GameListResponse::from_games(games)))
}

/// Popular games ranked by link, platform, and genre counts.
#[utoipa::path(
    get,
    path = "/speedrun/games/popular",
    tag = "catalog",
    params(PopularParams),
    responses(
        (status = 200, description = "Popular games", body = GameListResponse),
        (status = 502, description = "Every upstream strategy failed")
    )
)]
pub async fn popular_games(
    State(state): State<SharedState>,
    Query(params): Query<PopularParams>,
) -> Result<Json<GameListResponse>, AppError> {
    let games = catalog_service::popular_games(
        &state,
        params.limit,
        params.offset,
        params.official_only.unwrap_or(false),
    )
    .await?;
    Ok(Json(GameListResponse::from_games(games)))
}
