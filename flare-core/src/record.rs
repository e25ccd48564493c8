//! Untyped records validated against an entity schema.

use crate::error::ValidationError;
use crate::schema::{EntitySchema, CREATED_AT_FIELD, ID_FIELD};
use crate::value::{json_type_name, FieldValue};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

static NULL_VALUE: FieldValue = FieldValue::Null;

/// One row of one entity: field name to value.
///
/// Absent keys and explicit `Null` values are distinct while the record is in
/// memory (a partial update only touches present keys) but both read as null
/// through [`Record::value_or_null`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object, coercing every key against the schema.
    pub fn from_json(schema: &EntitySchema, json: &JsonValue) -> Result<Self, ValidationError> {
        let object = json.as_object().ok_or_else(|| ValidationError::MalformedRecord {
            reason: format!("expected a JSON object, got {}", json_type_name(json)),
        })?;

        let mut record = Record::new();
        for (key, raw) in object {
            let field = schema.require_field(key)?;
            record
                .values
                .insert(field.name.to_string(), FieldValue::from_json(field, raw)?);
        }
        Ok(record)
    }

    /// Check that every present key is a field of `schema` holding a value of
    /// the declared type.
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), ValidationError> {
        for (field, value) in self.iter() {
            let def = schema.require_field(field)?;
            if !value.conforms_to(def.field_type) {
                return Err(ValidationError::TypeMismatch {
                    field: def.name.to_string(),
                    expected: def.field_type,
                    found: value.type_name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Insert an explicit null for every schema field the record lacks.
    pub fn fill_nulls(&mut self, schema: &EntitySchema) {
        for name in schema.field_names() {
            self.values
                .entry(name.to_string())
                .or_insert(FieldValue::Null);
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let object: Map<String, JsonValue> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        JsonValue::Object(object)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn value_or_null(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&NULL_VALUE)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.values.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(FieldValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Copy every field present in `partial` onto this record, except the
    /// write-once `id` and `createdAt`.
    pub fn merge(&mut self, partial: &Record) {
        for (field, value) in partial.iter() {
            if field == ID_FIELD || field == CREATED_AT_FIELD {
                continue;
            }
            self.values.insert(field.to_string(), value.clone());
        }
    }

    /// Keep only the named fields. Fields the record lacks are omitted.
    pub fn project(&self, fields: &[&str]) -> Record {
        let values = fields
            .iter()
            .filter_map(|f| self.values.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect();
        Record { values }
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Record {
            values: iter.into_iter().collect(),
        }
    }
}
