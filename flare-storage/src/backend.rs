//! Backend trait for row-level storage primitives.
//!
//! A backend knows tables, rows and where expressions. It knows nothing about
//! defaults, required fields or which fields are write-once; that is the
//! [`Adapter`](crate::Adapter)'s job. Every method maps to one statement
//! against the backing store.

use ::async_trait::async_trait;
use flare_core::{EntitySchema, FlareResult, Query, Record, Where};

/// Storage primitives shared by every entity type.
///
/// Inputs have already been validated against `schema` by the caller.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name used in logs and metrics (e.g. "memory", "postgres").
    fn kind(&self) -> &'static str;

    /// Insert one complete row. Fails with `ConstraintError::DuplicateId`
    /// when a row with the same id exists.
    async fn insert(&self, schema: &EntitySchema, record: &Record) -> FlareResult<()>;

    /// Run a query: filter, order, skip, limit, project.
    async fn select(&self, schema: &EntitySchema, query: &Query) -> FlareResult<Vec<Record>>;

    /// Count matching rows. `None` counts the whole table.
    async fn count(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64>;

    /// Merge `changes` into every matching row and return how many matched.
    /// `changes` is non-empty and never contains write-once fields.
    async fn update(
        &self,
        schema: &EntitySchema,
        changes: &Record,
        filter: Option<&Where>,
    ) -> FlareResult<u64>;

    /// Overwrite every mutable column of row `id` with the values in
    /// `record`. Returns `false` when no such row exists.
    async fn replace(&self, schema: &EntitySchema, id: &str, record: &Record) -> FlareResult<bool>;

    /// Remove every matching row and return how many were removed.
    async fn delete(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> FlareResult<()>;
}
