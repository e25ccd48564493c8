//! Error types for flare operations

use crate::schema::FieldType;
use thiserror::Error;

/// Malformed or mistyped input. Raised before storage is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown field '{field}' on {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: String,
    },

    #[error("Unknown operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Field '{field}' cannot be null")]
    NotNullable { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Malformed filter: {reason}")]
    MalformedFilter { reason: String },

    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },
}

/// Required-field and uniqueness violations at write time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Required field '{field}' is missing on {entity}")]
    RequiredFieldMissing { entity: String, field: String },

    #[error("{entity} with id {id} already exists")]
    DuplicateId { entity: String, id: String },
}

/// Failures reported by the backing store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store connection failed: {reason}")]
    Connection { reason: String },

    #[error("Store query failed: {reason}")]
    Query { reason: String },

    #[error("Store returned an undecodable row for {entity}: {reason}")]
    Decode { entity: String, reason: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Every pooled connection stayed busy past the wait timeout.
    #[error("Store connection pool exhausted: {reason}")]
    PoolExhausted { reason: String },
}

/// Master error type for all flare errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlareError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl FlareError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        FlareError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FlareError::NotFound { .. })
    }
}

/// Result type alias for flare operations.
pub type FlareResult<T> = Result<T, FlareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_type_mismatch() {
        let err = ValidationError::TypeMismatch {
            field: "connectionTime".to_string(),
            expected: FieldType::Timestamp,
            found: "boolean".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("connectionTime"));
        assert!(msg.contains("timestamp"));
        assert!(msg.contains("boolean"));
    }

    #[test]
    fn test_constraint_error_display_duplicate() {
        let err = ConstraintError::DuplicateId {
            entity: "Job".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Job with id abc already exists");
    }

    #[test]
    fn test_flare_error_wraps_kinds() {
        let err: FlareError = StorageError::Unavailable {
            reason: "pool closed".to_string(),
        }
        .into();
        assert!(matches!(err, FlareError::Storage(_)));

        let err = FlareError::not_found("Node", "n-1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Node with id n-1 not found");
    }
}
