//! Generic CRUD route handlers for entity types.
//!
//! Every entity exposes the same eight endpoints. The handler bodies live
//! here, generic over [`ServiceFor`]; the per-entity modules generated by
//! [`entity_routes!`](crate::entity_routes) wrap them with OpenAPI
//! annotations and wire them into a router.
//!
//! Filters arrive as JSON in the query string (`?filter={...}` or
//! `?where={...}`) and bodies are parsed from raw bytes, so that malformed
//! input always produces the [`ApiError`] envelope.

use axum::{http::StatusCode, Json};
use flare_core::{Entity, Query, Record, Where};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{ApiError, ApiResult},
    services::EntityService,
    state::AppState,
};

/// Entities reachable through the request surface.
pub trait ServiceFor: Entity {
    fn service(state: &AppState) -> &EntityService<Self>;
}

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// `?filter=` carrying a JSON query: where, order, limit, skip, fields.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilterParams {
    /// JSON filter, e.g. `{"where":{"jobId":"j1"},"order":["createdAt DESC"],"limit":10}`
    pub filter: Option<String>,
}

/// `?where=` carrying a JSON where expression.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WhereParams {
    /// JSON where expression, e.g. `{"connected":true}`
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
}

/// Result of counting and bulk update endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

// ============================================================================
// PARSING
// ============================================================================

fn parse_json_param(name: &str, raw: Option<&str>) -> ApiResult<Option<JsonValue>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_str(s).map_err(|e| {
                ApiError::malformed_filter(format!("'{}' is not valid JSON: {}", name, e))
            })
        })
        .transpose()
}

fn parse_query<E: Entity>(params: &FilterParams) -> ApiResult<Query> {
    match parse_json_param("filter", params.filter.as_deref())? {
        Some(json) => Ok(Query::parse(E::SCHEMA, &json)?),
        None => Ok(Query::new()),
    }
}

fn parse_where<E: Entity>(params: &WhereParams) -> ApiResult<Option<Where>> {
    parse_json_param("where", params.where_clause.as_deref())?
        .map(|json| Where::parse(E::SCHEMA, &json))
        .transpose()
        .map_err(ApiError::from)
}

fn parse_body<E: Entity>(body: &[u8]) -> ApiResult<Record> {
    let json: JsonValue = serde_json::from_slice(body)?;
    Ok(Record::from_json(E::SCHEMA, &json)?)
}

// ============================================================================
// GENERIC HANDLER HELPERS
// ============================================================================

/// POST / - create a record and return it as stored.
pub async fn create_handler<E: ServiceFor>(state: &AppState, body: &[u8]) -> ApiResult<Json<E>> {
    let record = parse_body::<E>(body)?;
    let entity = E::service(state).create(record).await?;
    Ok(Json(entity))
}

/// GET / - records matching `?filter=`.
pub async fn list_handler<E: ServiceFor>(
    state: &AppState,
    params: &FilterParams,
) -> ApiResult<Json<Vec<JsonValue>>> {
    let query = parse_query::<E>(params)?;
    let records = E::service(state).find(&query).await?;
    Ok(Json(records.iter().map(Record::to_json).collect()))
}

/// GET /count - number of records matching `?where=`.
pub async fn count_handler<E: ServiceFor>(
    state: &AppState,
    params: &WhereParams,
) -> ApiResult<Json<CountResponse>> {
    let filter = parse_where::<E>(params)?;
    let count = E::service(state).count(filter.as_ref()).await?;
    Ok(Json(CountResponse { count }))
}

/// PATCH / - merge the body into every record matching `?where=`.
pub async fn update_all_handler<E: ServiceFor>(
    state: &AppState,
    params: &WhereParams,
    body: &[u8],
) -> ApiResult<Json<CountResponse>> {
    let filter = parse_where::<E>(params)?;
    let partial = parse_body::<E>(body)?;
    let count = E::service(state)
        .update_all(partial, filter.as_ref())
        .await?;
    Ok(Json(CountResponse { count }))
}

/// GET /:id - one record. Only the `fields` part of `?filter=` applies.
pub async fn get_handler<E: ServiceFor>(
    state: &AppState,
    id: &str,
    params: &FilterParams,
) -> ApiResult<Json<JsonValue>> {
    let query = parse_query::<E>(params)?;
    let record = E::service(state)
        .find_record_by_id(id, query.fields)
        .await?;
    Ok(Json(record.to_json()))
}

/// PATCH /:id - merge the body into one record.
pub async fn update_handler<E: ServiceFor>(
    state: &AppState,
    id: &str,
    body: &[u8],
) -> ApiResult<StatusCode> {
    let partial = parse_body::<E>(body)?;
    E::service(state).update_by_id(id, partial).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /:id - overwrite every mutable field of one record.
pub async fn replace_handler<E: ServiceFor>(
    state: &AppState,
    id: &str,
    body: &[u8],
) -> ApiResult<StatusCode> {
    let full = parse_body::<E>(body)?;
    E::service(state).replace_by_id(id, full).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /:id
pub async fn delete_handler<E: ServiceFor>(state: &AppState, id: &str) -> ApiResult<StatusCode> {
    E::service(state).delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use flare_core::{Job, Node};
    use flare_storage::InMemoryBackend;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(InMemoryBackend::new()))
    }

    fn filter(raw: &str) -> FilterParams {
        FilterParams {
            filter: Some(raw.to_string()),
        }
    }

    #[test]
    fn test_blank_params_mean_no_filter() {
        assert!(parse_json_param("where", Some("  ")).unwrap().is_none());
        assert!(parse_json_param("where", None).unwrap().is_none());
        assert_eq!(parse_query::<Job>(&FilterParams::default()).unwrap(), Query::new());
    }

    #[test]
    fn test_invalid_json_param_is_malformed_filter() {
        let err = parse_query::<Job>(&filter("{not json")).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedFilter);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_filter_field_is_rejected() {
        let err = parse_query::<Job>(&filter(r#"{"where":{"colour":"red"}}"#)).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownField);
    }

    #[test]
    fn test_invalid_body_is_invalid_input() {
        let err = parse_body::<Job>(b"[1, 2").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_update_handler_returns_no_content() {
        let state = state();
        let Json(node) = create_handler::<Node>(
            &state,
            br#"{"jobId":"j","name":"a","running":true}"#,
        )
        .await
        .unwrap();

        let status = update_handler::<Node>(&state, &node.id, br#"{"totalFailedConnections":2}"#)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(fetched) = get_handler::<Node>(&state, &node.id, &FilterParams::default())
            .await
            .unwrap();
        assert_eq!(fetched["totalFailedConnections"], 2);
        assert_eq!(fetched["totalSuccessfulConnections"], 0);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let err = delete_handler::<Job>(&state(), "missing").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
