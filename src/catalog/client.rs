use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::catalog::models::{GamesEnvelope, RawGame};

/// Convenient result alias returning [`CatalogError`] failures.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failures that can occur while talking to the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build catalog client")]
    ClientBuilder {
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or timed out.
    #[error("failed to query catalog endpoint `{path}`")]
    RequestSend {
        /// Endpoint path that was queried.
        path: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// The remote returned an unexpected status code.
    #[error("unexpected catalog response status {status} for `{path}`")]
    RequestStatus {
        /// Endpoint path that was queried.
        path: String,
        /// Status code received.
        status: StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode catalog response for `{path}`")]
    DecodeResponse {
        /// Endpoint path that was queried.
        path: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
    /// Every aggregation strategy failed and nothing was collected.
    #[error("all catalog strategies failed")]
    Exhausted,
}

/// Sort order accepted by the remote games endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamesOrder {
    /// Relevance to the name filter.
    Similarity,
    /// Creation date, newest first.
    CreatedDesc,
}

impl GamesOrder {
    fn query_pairs(self) -> [(&'static str, &'static str); 2] {
        match self {
            GamesOrder::Similarity => [("orderby", "similarity"), ("direction", "desc")],
            GamesOrder::CreatedDesc => [("orderby", "created"), ("direction", "desc")],
        }
    }
}

/// Thin typed client over the remote read-only games endpoint.
///
/// The remote is treated as unreliable and rate-limited: every request
/// carries a fixed timeout and callers are expected to pace themselves.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Arc<str>,
}

impl CatalogClient {
    /// Build a client targeting `base_url` with a per-request timeout.
    pub fn new(base_url: &str, request_timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| CatalogError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    /// Fetch one page of games matching `name`, starting at `offset`.
    pub async fn games_by_name(
        &self,
        name: &str,
        max: u32,
        offset: u32,
    ) -> CatalogResult<Vec<RawGame>> {
        let query = [
            ("name", name.to_string()),
            ("max", max.to_string()),
            ("offset", offset.to_string()),
        ];
        self.fetch_games(&query).await
    }

    /// Fetch one page of games using a remote-side sort order and no name
    /// filter.
    pub async fn games_ordered(
        &self,
        order: GamesOrder,
        max: u32,
        offset: u32,
    ) -> CatalogResult<Vec<RawGame>> {
        let mut query: Vec<(&str, String)> = order
            .query_pairs()
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        query.push(("max", max.to_string()));
        query.push(("offset", offset.to_string()));
        self.fetch_games(&query).await
    }

    /// Fetch one unsorted, unfiltered page; the aggregator's last-resort
    /// strategy.
    pub async fn games_unsorted(&self, max: u32, offset: u32) -> CatalogResult<Vec<RawGame>> {
        let query = [("max", max.to_string()), ("offset", offset.to_string())];
        self.fetch_games(&query).await
    }

    async fn fetch_games<K: serde::Serialize + ?Sized>(
        &self,
        query: &K,
    ) -> CatalogResult<Vec<RawGame>> {
        const PATH: &str = "games";
        let url = format!("{}/{}", self.base_url, PATH);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| CatalogError::RequestSend {
                path: PATH.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::RequestStatus {
                path: PATH.to_string(),
                status,
            });
        }

        let envelope = response.json::<GamesEnvelope>().await.map_err(|source| {
            CatalogError::DecodeResponse {
                path: PATH.to_string(),
                source,
            }
        })?;

        Ok(envelope.data)
    }
}
