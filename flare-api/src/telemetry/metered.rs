//! Store operation metrics.
//!
//! [`MeteredBackend`] wraps any [`StorageBackend`] and records a counter and
//! a latency histogram sample for every call, labeled by operation, entity
//! and backend kind.

use ::async_trait::async_trait;
use flare_core::{EntitySchema, FlareResult, Query, Record, Where};
use flare_storage::StorageBackend;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::metrics::METRICS;

#[derive(Clone)]
pub struct MeteredBackend {
    inner: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for MeteredBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeteredBackend")
            .field("kind", &self.inner.kind())
            .finish()
    }
}

impl MeteredBackend {
    pub fn new(inner: Arc<dyn StorageBackend>) -> Self {
        Self { inner }
    }

    pub fn into_shared(self) -> Arc<dyn StorageBackend> {
        Arc::new(self)
    }

    async fn observe<T, F>(&self, operation: &str, entity: &str, fut: F) -> FlareResult<T>
    where
        F: Future<Output = FlareResult<T>>,
    {
        let start = Instant::now();
        let result = fut.await;
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_db_operation(
                operation,
                entity,
                self.inner.kind(),
                result.is_ok(),
                start.elapsed().as_secs_f64(),
            );
        }
        result
    }
}

#[async_trait]
impl StorageBackend for MeteredBackend {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    async fn insert(&self, schema: &EntitySchema, record: &Record) -> FlareResult<()> {
        self.observe("insert", schema.name, self.inner.insert(schema, record))
            .await
    }

    async fn select(&self, schema: &EntitySchema, query: &Query) -> FlareResult<Vec<Record>> {
        self.observe("select", schema.name, self.inner.select(schema, query))
            .await
    }

    async fn count(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64> {
        self.observe("count", schema.name, self.inner.count(schema, filter))
            .await
    }

    async fn update(
        &self,
        schema: &EntitySchema,
        changes: &Record,
        filter: Option<&Where>,
    ) -> FlareResult<u64> {
        self.observe(
            "update",
            schema.name,
            self.inner.update(schema, changes, filter),
        )
        .await
    }

    async fn replace(&self, schema: &EntitySchema, id: &str, record: &Record) -> FlareResult<bool> {
        self.observe("replace", schema.name, self.inner.replace(schema, id, record))
            .await
    }

    async fn delete(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64> {
        self.observe("delete", schema.name, self.inner.delete(schema, filter))
            .await
    }

    async fn ping(&self) -> FlareResult<()> {
        self.observe("ping", "-", self.inner.ping()).await
    }
}
