//! Utility macros for reducing boilerplate

/// Macro to implement `FromRef<AppState>` for state extractors.
///
/// # Example
/// ```ignore
/// impl_from_ref!(JobService, jobs);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for JobService {
///     fn from_ref(state: &AppState) -> Self {
///         state.jobs.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}

/// Implement [`ServiceFor`](crate::routes::generic::ServiceFor) for an
/// entity, pointing it at its service field on `AppState`.
///
/// # Example
/// ```ignore
/// impl_service_for!(Job, jobs);
/// ```
#[macro_export]
macro_rules! impl_service_for {
    ($entity:ty, $field:ident) => {
        impl $crate::routes::generic::ServiceFor for $entity {
            fn service(
                state: &$crate::state::AppState,
            ) -> &$crate::services::EntityService<Self> {
                &state.$field
            }
        }
    };
}

/// Generate the documented route handlers and router for one entity.
///
/// Expands, in the calling module, to one `#[utoipa::path]` handler per
/// endpoint (each delegating to [`crate::routes::generic`]) plus
/// `create_router()`.
///
/// # Example
/// ```ignore
/// entity_routes! {
///     entity: Job,
///     field: jobs,
///     tag: "Jobs",
///     base: "/jobs",
///     count: "/jobs/count",
///     by_id: "/jobs/{id}",
/// }
/// ```
#[macro_export]
macro_rules! entity_routes {
    (
        entity: $entity:ident,
        field: $field:ident,
        tag: $tag:tt,
        base: $base:tt,
        count: $count:tt,
        by_id: $by_id:tt $(,)?
    ) => {
        use axum::{
            body::Bytes,
            extract::{Path, State},
            http::StatusCode,
            routing::get,
            Json, Router,
        };
        use flare_core::$entity;
        use serde_json::Value as JsonValue;
        use $crate::error::{ApiError, ApiResult};
        use $crate::extractors::ApiQuery;
        use $crate::routes::generic::{self, CountResponse, FilterParams, WhereParams};
        use $crate::state::AppState;

        $crate::impl_service_for!($entity, $field);

        /// Create a record. Omitted defaulted fields are filled in.
        #[utoipa::path(
            post,
            path = $base,
            tag = $tag,
            request_body = $entity,
            responses(
                (status = 200, description = "Created record", body = $entity),
                (status = 400, description = "Malformed body", body = ApiError),
                (status = 422, description = "Required field missing or duplicate id", body = ApiError),
            ),
        )]
        pub async fn create(
            State(state): State<AppState>,
            body: Bytes,
        ) -> ApiResult<Json<$entity>> {
            generic::create_handler::<$entity>(&state, &body).await
        }

        /// Records matching a filter.
        #[utoipa::path(
            get,
            path = $base,
            tag = $tag,
            params(FilterParams),
            responses(
                (status = 200, description = "Matching records", body = [$entity]),
                (status = 400, description = "Malformed filter", body = ApiError),
            ),
        )]
        pub async fn find(
            State(state): State<AppState>,
            ApiQuery(params): ApiQuery<FilterParams>,
        ) -> ApiResult<Json<Vec<JsonValue>>> {
            generic::list_handler::<$entity>(&state, &params).await
        }

        /// Count records matching a where expression.
        #[utoipa::path(
            get,
            path = $count,
            tag = $tag,
            params(WhereParams),
            responses(
                (status = 200, description = "Matching record count", body = CountResponse),
                (status = 400, description = "Malformed filter", body = ApiError),
            ),
        )]
        pub async fn count(
            State(state): State<AppState>,
            ApiQuery(params): ApiQuery<WhereParams>,
        ) -> ApiResult<Json<CountResponse>> {
            generic::count_handler::<$entity>(&state, &params).await
        }

        /// Merge the body into every record matching a where expression.
        #[utoipa::path(
            patch,
            path = $base,
            tag = $tag,
            params(WhereParams),
            request_body = $entity,
            responses(
                (status = 200, description = "Updated record count", body = CountResponse),
                (status = 400, description = "Malformed body or filter", body = ApiError),
            ),
        )]
        pub async fn update_all(
            State(state): State<AppState>,
            ApiQuery(params): ApiQuery<WhereParams>,
            body: Bytes,
        ) -> ApiResult<Json<CountResponse>> {
            generic::update_all_handler::<$entity>(&state, &params, &body).await
        }

        #[utoipa::path(
            get,
            path = $by_id,
            tag = $tag,
            params(("id" = String, Path, description = "Record id"), FilterParams),
            responses(
                (status = 200, description = "The record", body = $entity),
                (status = 404, description = "No record with this id", body = ApiError),
            ),
        )]
        pub async fn find_by_id(
            State(state): State<AppState>,
            Path(id): Path<String>,
            ApiQuery(params): ApiQuery<FilterParams>,
        ) -> ApiResult<Json<JsonValue>> {
            generic::get_handler::<$entity>(&state, &id, &params).await
        }

        #[utoipa::path(
            patch,
            path = $by_id,
            tag = $tag,
            params(("id" = String, Path, description = "Record id")),
            request_body = $entity,
            responses(
                (status = 204, description = "Record updated"),
                (status = 404, description = "No record with this id", body = ApiError),
            ),
        )]
        pub async fn update_by_id(
            State(state): State<AppState>,
            Path(id): Path<String>,
            body: Bytes,
        ) -> ApiResult<StatusCode> {
            generic::update_handler::<$entity>(&state, &id, &body).await
        }

        #[utoipa::path(
            put,
            path = $by_id,
            tag = $tag,
            params(("id" = String, Path, description = "Record id")),
            request_body = $entity,
            responses(
                (status = 204, description = "Record replaced"),
                (status = 404, description = "No record with this id", body = ApiError),
                (status = 422, description = "Required field missing", body = ApiError),
            ),
        )]
        pub async fn replace_by_id(
            State(state): State<AppState>,
            Path(id): Path<String>,
            body: Bytes,
        ) -> ApiResult<StatusCode> {
            generic::replace_handler::<$entity>(&state, &id, &body).await
        }

        #[utoipa::path(
            delete,
            path = $by_id,
            tag = $tag,
            params(("id" = String, Path, description = "Record id")),
            responses(
                (status = 204, description = "Record deleted"),
                (status = 404, description = "No record with this id", body = ApiError),
            ),
        )]
        pub async fn delete_by_id(
            State(state): State<AppState>,
            Path(id): Path<String>,
        ) -> ApiResult<StatusCode> {
            generic::delete_handler::<$entity>(&state, &id).await
        }

        pub fn create_router() -> Router<AppState> {
            Router::new()
                .route("/", get(find).post(create).patch(update_all))
                .route("/count", get(count))
                .route(
                    "/:id",
                    get(find_by_id)
                        .patch(update_by_id)
                        .put(replace_by_id)
                        .delete(delete_by_id),
                )
        }
    };
}
