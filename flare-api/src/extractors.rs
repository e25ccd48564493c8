//! Request extractors that reject with the [`ApiError`] envelope.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Query-string extractor.
///
/// Same decoding as axum's `Query<T>`, but an undecodable query string
/// becomes a 400 `MALFORMED_FILTER` instead of a plain-text rejection.
///
/// ```ignore
/// async fn find(ApiQuery(params): ApiQuery<FilterParams>) -> ApiResult<...> { ... }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::malformed_filter(format!("Invalid query string: {}", e.body_text()))
            })?;
        Ok(ApiQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::routes::generic::FilterParams;
    use axum::http::{Request, StatusCode};

    async fn extract(uri: &str) -> Result<ApiQuery<FilterParams>, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ApiQuery::<FilterParams>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_decodes_like_query() {
        let ApiQuery(params) = extract("/jobs?filter=%7B%22limit%22%3A1%7D").await.unwrap();
        assert_eq!(params.filter.as_deref(), Some(r#"{"limit":1}"#));

        let ApiQuery(params) = extract("/jobs").await.unwrap();
        assert!(params.filter.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_parameter_is_malformed_filter() {
        let err = extract("/jobs?filter=a&filter=b").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedFilter);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("Invalid query string"));
    }
}
