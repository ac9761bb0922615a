//! Remote catalog queries with server-side bounds on result sizes.

use crate::catalog::RemoteGame;
use crate::error::ServiceError;
use crate::state::SharedState;

/// Default and maximum result counts for the bounded search.
const SEARCH_DEFAULT_LIMIT: usize = 20;
const SEARCH_MAX_LIMIT: usize = 100;

/// Default and maximum result counts for the exhaustive search.
const EXHAUSTIVE_DEFAULT_MAX: usize = 200;
const EXHAUSTIVE_MAX: usize = 500;

/// Default and maximum result counts for the popular listing.
const POPULAR_DEFAULT_LIMIT: usize = 20;
const POPULAR_MAX_LIMIT: usize = 100;

/// Bounded catalog search. An empty result is a valid answer.
pub async fn search_games(
    state: &SharedState,
    query: &str,
    limit: Option<usize>,
) -> Result<Vec<RemoteGame>, ServiceError> {
    if query.trim().is_empty() {
        return Err(ServiceError::InvalidInput("query must not be blank".into()));
    }
    let limit = clamp(limit, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT);
    Ok(state.aggregator().search(query, limit, false).await)
}

/// Exhaustive catalog search with a larger collection budget.
pub async fn search_games_exhaustive(
    state: &SharedState,
    query: &str,
    max: Option<usize>,
) -> Result<Vec<RemoteGame>, ServiceError> {
    if query.trim().is_empty() {
        return Err(ServiceError::InvalidInput("query must not be blank".into()));
    }
    let max = clamp(max, EXHAUSTIVE_DEFAULT_MAX, EXHAUSTIVE_MAX);
    Ok(state.aggregator().search(query, max, true).await)
}

/// Popular games listing. Fails with an upstream error only when every
/// strategy failed and nothing was collected.
pub async fn popular_games(
    state: &SharedState,
    limit: Option<usize>,
    offset: Option<usize>,
    official_only: bool,
) -> Result<Vec<RemoteGame>, ServiceError> {
    let limit = clamp(limit, POPULAR_DEFAULT_LIMIT, POPULAR_MAX_LIMIT);
    let offset = offset.unwrap_or(0);
    state
        .aggregator()
        .popular(limit, offset, official_only)
        .await
        .map_err(ServiceError::Upstream)
}

fn clamp(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::clamp;

    #[test]
    fn clamps_requested_limits_into_bounds() {
        assert_eq!(clamp(None, 20, 100), 20);
        assert_eq!(clamp(Some(0), 20, 100), 1);
        assert_eq!(clamp(Some(50), 20, 100), 50);
        assert_eq!(clamp(Some(1_000), 20, 100), 100);
    }
}
