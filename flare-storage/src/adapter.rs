//! The generic entity adapter.
//!
//! One [`Adapter`] serves every entity type. It is parameterized by a static
//! [`EntitySchema`] and owns all entity-level rules: defaults, required
//! fields, write-once fields and not-found reporting. Row access goes through
//! the injected [`StorageBackend`].

use crate::backend::StorageBackend;
use flare_core::{
    now, ConstraintError, EntitySchema, FieldValue, FlareError, FlareResult, Projection, Query,
    Record, ValidationError, Where, CREATED_AT_FIELD, ID_FIELD,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Store operations for one entity type.
#[derive(Clone)]
pub struct Adapter {
    schema: &'static EntitySchema,
    backend: Arc<dyn StorageBackend>,
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("entity", &self.schema.name)
            .field("backend", &self.backend.kind())
            .finish()
    }
}

impl Adapter {
    pub fn new(schema: &'static EntitySchema, backend: Arc<dyn StorageBackend>) -> Self {
        Self { schema, backend }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Persist a new record and return it as stored.
    ///
    /// Missing or null defaulted fields (including `id` and `createdAt`) are
    /// filled in; every other absent field is stored as null. A supplied
    /// `id` must not be blank.
    pub async fn create(&self, record: Record) -> FlareResult<Record> {
        record.validate(self.schema)?;
        if record.id().is_some_and(|id| id.trim().is_empty()) {
            return Err(ValidationError::InvalidValue {
                field: ID_FIELD.to_string(),
                reason: "id must not be blank".to_string(),
            }
            .into());
        }

        let created_at = now();
        let mut stored = record;
        for field in self.schema.fields {
            let missing = stored.value_or_null(field.name).is_null();
            if let (true, Some(default)) = (missing, field.default) {
                stored.insert(field.name, default.produce(created_at));
            }
        }
        self.check_required(&stored)?;
        stored.fill_nulls(self.schema);

        self.backend.insert(self.schema, &stored).await?;
        debug!(
            entity = self.schema.name,
            id = stored.id().unwrap_or_default(),
            "Created record"
        );
        Ok(stored)
    }

    // ========================================================================
    // Read
    // ========================================================================

    pub async fn find(&self, query: &Query) -> FlareResult<Vec<Record>> {
        query.validate(self.schema)?;
        let rows = self.backend.select(self.schema, query).await?;
        debug!(entity = self.schema.name, rows = rows.len(), "Find completed");
        Ok(rows)
    }

    pub async fn count(&self, filter: Option<&Where>) -> FlareResult<u64> {
        if let Some(filter) = filter {
            filter.validate(self.schema)?;
        }
        self.backend.count(self.schema, filter).await
    }

    pub async fn find_by_id(&self, id: &str) -> FlareResult<Record> {
        self.find_by_id_projected(id, None).await
    }

    /// Fetch one record, optionally narrowed to a projection.
    pub async fn find_by_id_projected(
        &self,
        id: &str,
        fields: Option<Projection>,
    ) -> FlareResult<Record> {
        let mut query = Query::new().filter(Where::id_eq(id)).limit(1);
        query.fields = fields;
        query.validate(self.schema)?;

        self.backend
            .select(self.schema, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn exists(&self, id: &str) -> FlareResult<bool> {
        let count = self
            .backend
            .count(self.schema, Some(&Where::id_eq(id)))
            .await?;
        Ok(count > 0)
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Merge `partial` into the record addressed by `id`.
    pub async fn update_by_id(&self, id: &str, partial: Record) -> FlareResult<()> {
        let changes = self.prepare_changes(partial)?;
        let filter = Where::id_eq(id);

        let affected = if changes.is_empty() {
            self.backend.count(self.schema, Some(&filter)).await?
        } else {
            self.backend
                .update(self.schema, &changes, Some(&filter))
                .await?
        };

        if affected == 0 {
            return Err(self.not_found(id));
        }
        debug!(entity = self.schema.name, id, fields = changes.len(), "Updated record");
        Ok(())
    }

    /// Merge `partial` into every record matching `filter` and return how
    /// many matched. Zero matches is not an error.
    pub async fn update_all(&self, partial: Record, filter: Option<&Where>) -> FlareResult<u64> {
        let changes = self.prepare_changes(partial)?;
        if let Some(filter) = filter {
            filter.validate(self.schema)?;
        }

        let affected = if changes.is_empty() {
            self.backend.count(self.schema, filter).await?
        } else {
            self.backend.update(self.schema, &changes, filter).await?
        };
        debug!(entity = self.schema.name, affected, "Bulk update completed");
        Ok(affected)
    }

    /// Overwrite every mutable field of the record addressed by `id`.
    ///
    /// Fields absent from `full` become null, or their default when the
    /// field declares one. `id` and `createdAt` are never changed.
    pub async fn replace_by_id(&self, id: &str, full: Record) -> FlareResult<()> {
        full.validate(self.schema)?;

        let created_at = now();
        let mut replacement = Record::new();
        for field in self.schema.mutable_fields() {
            let value = match full.get(field.name) {
                Some(value) if !value.is_null() => value.clone(),
                _ => field
                    .default
                    .map(|d| d.produce(created_at))
                    .unwrap_or(FieldValue::Null),
            };
            replacement.insert(field.name, value);
        }
        self.check_required(&replacement)?;

        if !self.backend.replace(self.schema, id, &replacement).await? {
            return Err(self.not_found(id));
        }
        debug!(entity = self.schema.name, id, "Replaced record");
        Ok(())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    pub async fn delete_by_id(&self, id: &str) -> FlareResult<()> {
        let removed = self
            .backend
            .delete(self.schema, Some(&Where::id_eq(id)))
            .await?;
        if removed == 0 {
            return Err(self.not_found(id));
        }
        debug!(entity = self.schema.name, id, "Deleted record");
        Ok(())
    }

    /// Remove every record matching `filter` and return how many were removed.
    pub async fn delete_all(&self, filter: Option<&Where>) -> FlareResult<u64> {
        if let Some(filter) = filter {
            filter.validate(self.schema)?;
        } else {
            warn!(entity = self.schema.name, "Deleting every record");
        }
        let removed = self.backend.delete(self.schema, filter).await?;
        debug!(entity = self.schema.name, removed, "Bulk delete completed");
        Ok(removed)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Validate a partial and drop the write-once fields from it.
    fn prepare_changes(&self, partial: Record) -> Result<Record, ValidationError> {
        partial.validate(self.schema)?;

        let mut changes = partial;
        changes.remove(ID_FIELD);
        changes.remove(CREATED_AT_FIELD);

        for field in self.schema.required_fields() {
            if changes.get(field.name).is_some_and(FieldValue::is_null) {
                return Err(ValidationError::NotNullable {
                    field: field.name.to_string(),
                });
            }
        }
        Ok(changes)
    }

    fn check_required(&self, record: &Record) -> Result<(), ConstraintError> {
        match self
            .schema
            .required_fields()
            .find(|f| record.value_or_null(f.name).is_null())
        {
            Some(field) => Err(ConstraintError::RequiredFieldMissing {
                entity: self.schema.name.to_string(),
                field: field.name.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn not_found(&self, id: &str) -> FlareError {
        FlareError::not_found(self.schema.name, id)
    }
}
