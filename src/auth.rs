//! Caller identity extraction.
//!
//! Authentication itself is delegated to an upstream identity layer (API
//! gateway / session service) which installs the authenticated user id in
//! the `X-User-Id` header. This module only lifts that id into a typed
//! extractor; a missing or malformed header is a hard 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Header installed by the upstream identity layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller identity, required by every race mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("missing caller identity".into()))?;

        let value = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("malformed caller identity".into()))?;

        let user_id = value
            .parse::<Uuid>()
            .map_err(|_| AppError::Unauthorized("malformed caller identity".into()))?;

        Ok(CurrentUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequestParts;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<CurrentUser, AppError> {
        let (mut parts, _body) = request.into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn accepts_a_valid_user_id() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header("x-user-id", id.to_string())
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), CurrentUser(id));
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_identities() {
        let missing = Request::builder().body(()).unwrap();
        assert!(extract(missing).await.is_err());

        let malformed = Request::builder()
            .header("x-user-id", "not-a-uuid")
            .body(())
            .unwrap();
        assert!(extract(malformed).await.is_err());
    }
}
