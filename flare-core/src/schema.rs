//! Static schema descriptors.
//!
//! Every entity type supplies one [`EntitySchema`]: its name, its table and an
//! ordered list of [`FieldDef`]s. The shared storage adapter reads nothing
//! else about an entity, so adding a new entity type means writing a new
//! descriptor rather than a new repository.

use crate::error::ValidationError;
use crate::value::FieldValue;
use crate::{new_entity_id, Timestamp};
use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the primary identifier field shared by all entities.
pub const ID_FIELD: &str = "id";

/// Name of the creation timestamp field, when an entity declares one.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Number,
    Timestamp,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Timestamp => "timestamp",
        }
    }

    /// Column type used when the relational store creates the table.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::String => "TEXT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Integer => "BIGINT",
            FieldType::Number => "DOUBLE PRECISION",
            FieldType::Timestamp => "TIMESTAMPTZ",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule used to fill a field that was omitted at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// A fresh random identifier.
    GeneratedId,
    /// The creation instant.
    Now,
    /// A fixed integer.
    Integer(i64),
}

impl DefaultValue {
    /// Produce the value for a record created at `now`.
    pub fn produce(&self, now: Timestamp) -> FieldValue {
        match self {
            DefaultValue::GeneratedId => FieldValue::Text(new_entity_id()),
            DefaultValue::Now => FieldValue::Timestamp(now),
            DefaultValue::Integer(n) => FieldValue::Integer(*n),
        }
    }
}

/// Description of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub identifying: bool,
    pub default: Option<DefaultValue>,
}

impl FieldDef {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            identifying: false,
            default: None,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn identifying(self) -> Self {
        Self {
            identifying: true,
            ..self
        }
    }

    pub const fn with_default(self, default: DefaultValue) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    /// `id` and `createdAt` are written once at creation.
    pub fn is_immutable(&self) -> bool {
        self.name == ID_FIELD || self.name == CREATED_AT_FIELD
    }
}

/// Static descriptor of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Display name used in errors and logs (e.g. "Job").
    pub name: &'static str,
    /// Table name in the relational store (e.g. "jobs").
    pub table: &'static str,
    pub fields: &'static [FieldDef],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field, failing with `UnknownField` when the entity lacks it.
    pub fn require_field(&self, name: &str) -> Result<&'static FieldDef, ValidationError> {
        self.field(name).ok_or_else(|| ValidationError::UnknownField {
            entity: self.name.to_string(),
            field: name.to_string(),
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDef> + '_ {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn mutable_fields(&self) -> impl Iterator<Item = &'static FieldDef> + '_ {
        self.fields.iter().filter(|f| !f.is_immutable())
    }

    pub fn declares_created_at(&self) -> bool {
        self.has_field(CREATED_AT_FIELD)
    }
}

/// Current instant at the store's native (microsecond) precision.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}
