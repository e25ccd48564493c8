//! Error Types for the flare API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flare_core::{ConstraintError, FlareError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Field is not declared by the entity
    UnknownField,

    /// Filter uses an operator the filter language does not define
    UnknownOperator,

    /// Filter or query structure is malformed
    MalformedFilter,

    // ========================================================================
    // Constraint Errors (422)
    // ========================================================================
    /// Required field is missing from a stored record
    MissingField,

    /// Entity with the same identifier already exists
    EntityAlreadyExists,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::UnknownField
            | ErrorCode::UnknownOperator
            | ErrorCode::MalformedFilter => StatusCode::BAD_REQUEST,

            ErrorCode::MissingField | ErrorCode::EntityAlreadyExists => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::UnknownField => "Unknown field",
            ErrorCode::UnknownOperator => "Unknown filter operator",
            ErrorCode::MalformedFilter => "Malformed filter",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
///
/// This type is returned by all API endpoints when an error occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (offending field, entity, id)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn malformed_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedFilter, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    /// Create an EntityAlreadyExists error.
    pub fn entity_already_exists(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityAlreadyExists,
            format!("{} with id {} already exists", entity_type, id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
///
/// ```ignore
/// async fn handler() -> Result<Json<Job>, ApiError> {
///     Err(ApiError::entity_not_found("Job", "j-1"))
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN AND STANDARD ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::UnknownField { entity, field } => {
                ApiError::new(ErrorCode::UnknownField, message)
                    .with_details(serde_json::json!({ "entity": entity, "field": field }))
            }
            ValidationError::UnknownOperator { field, operator } => {
                ApiError::new(ErrorCode::UnknownOperator, message)
                    .with_details(serde_json::json!({ "field": field, "operator": operator }))
            }
            ValidationError::MalformedFilter { .. } => ApiError::malformed_filter(message),
            ValidationError::TypeMismatch { field, .. }
            | ValidationError::NotNullable { field }
            | ValidationError::InvalidValue { field, .. } => ApiError::validation_failed(message)
                .with_details(serde_json::json!({ "field": field })),
            ValidationError::MalformedRecord { .. } => ApiError::invalid_input(message),
        }
    }
}

impl From<ConstraintError> for ApiError {
    fn from(err: ConstraintError) -> Self {
        match err {
            ConstraintError::RequiredFieldMissing { entity, field } => {
                ApiError::missing_field(&field)
                    .with_details(serde_json::json!({ "entity": entity, "field": field }))
            }
            ConstraintError::DuplicateId { entity, id } => {
                ApiError::entity_already_exists(&entity, &id)
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Storage error: {}", err);

        match err {
            StorageError::Unavailable { reason } => ApiError::service_unavailable(reason),
            StorageError::PoolExhausted { .. } => ApiError::connection_pool_exhausted(),
            // Keep driver details out of responses.
            StorageError::Connection { .. }
            | StorageError::Query { .. }
            | StorageError::Decode { .. } => ApiError::from_code(ErrorCode::DatabaseError),
        }
    }
}

impl From<FlareError> for ApiError {
    fn from(err: FlareError) -> Self {
        match err {
            FlareError::Validation(e) => e.into(),
            FlareError::Constraint(e) => e.into(),
            FlareError::NotFound { entity, id } => ApiError::entity_not_found(&entity, id),
            FlareError::Storage(e) => e.into(),
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON parse error: {:?}", err);
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
