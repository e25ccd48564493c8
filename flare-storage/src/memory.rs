//! In-memory backend used by tests and by `FLARE_STORE=memory`.

use crate::backend::StorageBackend;
use ::async_trait::async_trait;
use flare_core::{
    ConstraintError, EntitySchema, FlareResult, Query, Record, Where, CREATED_AT_FIELD, ID_FIELD,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tables of records kept in insertion order.
///
/// The lock is held for exactly one operation, so each call behaves like a
/// single statement against a relational store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every row of every table.
    pub async fn clear(&self) {
        self.tables.write().await.clear();
    }

    /// Number of rows currently held for `schema`.
    pub async fn row_count(&self, schema: &EntitySchema) -> usize {
        self.tables
            .read()
            .await
            .get(schema.table)
            .map_or(0, Vec::len)
    }
}

fn matches(filter: Option<&Where>, record: &Record) -> bool {
    filter.map_or(true, |f| f.matches(record))
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, schema: &EntitySchema, record: &Record) -> FlareResult<()> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(schema.table.to_string()).or_default();

        if let Some(id) = record.id() {
            if rows.iter().any(|r| r.id() == Some(id)) {
                return Err(ConstraintError::DuplicateId {
                    entity: schema.name.to_string(),
                    id: id.to_string(),
                }
                .into());
            }
        }
        rows.push(record.clone());
        Ok(())
    }

    async fn select(&self, schema: &EntitySchema, query: &Query) -> FlareResult<Vec<Record>> {
        let tables = self.tables.read().await;
        let rows = tables.get(schema.table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(query.evaluate(schema, rows)?)
    }

    async fn count(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .get(schema.table)
            .map_or(0, |rows| rows.iter().filter(|r| matches(filter, r)).count());
        Ok(count as u64)
    }

    async fn update(
        &self,
        schema: &EntitySchema,
        changes: &Record,
        filter: Option<&Where>,
    ) -> FlareResult<u64> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(schema.table) else {
            return Ok(0);
        };

        let mut affected = 0;
        for row in rows.iter_mut().filter(|r| matches(filter, r)) {
            row.merge(changes);
            affected += 1;
        }
        Ok(affected)
    }

    async fn replace(&self, schema: &EntitySchema, id: &str, record: &Record) -> FlareResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(schema.table)
            .and_then(|rows| rows.iter_mut().find(|r| r.id() == Some(id)))
        else {
            return Ok(false);
        };

        let mut replacement = record.clone();
        for field in [ID_FIELD, CREATED_AT_FIELD] {
            match row.get(field) {
                Some(kept) => replacement.insert(field, kept.clone()),
                None => {
                    replacement.remove(field);
                }
            }
        }
        *row = replacement;
        Ok(true)
    }

    async fn delete(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(schema.table) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|r| !matches(filter, r));
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> FlareResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flare_core::{FlareError, OrderKey, NODE_SCHEMA, SOCKET_SCHEMA};

    fn node(id: &str, job: &str) -> Record {
        Record::new()
            .with("id", id)
            .with("jobId", job)
            .with("name", id)
            .with("running", true)
            .with("totalFailedConnections", 0i64)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let backend = InMemoryBackend::new();
        backend.insert(&NODE_SCHEMA, &node("n1", "j")).await.unwrap();

        let err = backend.insert(&NODE_SCHEMA, &node("n1", "k")).await.unwrap_err();
        assert!(matches!(
            err,
            FlareError::Constraint(ConstraintError::DuplicateId { .. })
        ));
        assert_eq!(backend.row_count(&NODE_SCHEMA).await, 1);
    }

    #[tokio::test]
    async fn test_tables_are_separate() {
        let backend = InMemoryBackend::new();
        backend.insert(&NODE_SCHEMA, &node("x", "j")).await.unwrap();
        backend
            .insert(&SOCKET_SCHEMA, &Record::new().with("id", "x").with("jobId", "j"))
            .await
            .unwrap();

        assert_eq!(backend.count(&NODE_SCHEMA, None).await.unwrap(), 1);
        assert_eq!(backend.count(&SOCKET_SCHEMA, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_select_keeps_insertion_order() {
        let backend = InMemoryBackend::new();
        for id in ["c", "a", "b"] {
            backend.insert(&NODE_SCHEMA, &node(id, "j")).await.unwrap();
        }

        let rows = backend.select(&NODE_SCHEMA, &Query::new()).await.unwrap();
        let ids: Vec<_> = rows.iter().filter_map(Record::id).collect();
        assert_eq!(ids, ["c", "a", "b"]);

        let sorted = backend
            .select(&NODE_SCHEMA, &Query::new().order_by(OrderKey::asc("id")))
            .await
            .unwrap();
        let ids: Vec<_> = sorted.iter().filter_map(Record::id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_filter() {
        let backend = InMemoryBackend::new();
        for (id, job) in [("a", "j1"), ("b", "j2"), ("c", "j2")] {
            backend.insert(&NODE_SCHEMA, &node(id, job)).await.unwrap();
        }
        let in_j2 = Where::eq("jobId", "j2");

        let changes = Record::new().with("running", false);
        let affected = backend
            .update(&NODE_SCHEMA, &changes, Some(&in_j2))
            .await
            .unwrap();
        assert_eq!(affected, 2);
        assert_eq!(
            backend
                .count(&NODE_SCHEMA, Some(&Where::eq("running", false)))
                .await
                .unwrap(),
            2
        );

        assert_eq!(backend.delete(&NODE_SCHEMA, Some(&in_j2)).await.unwrap(), 2);
        assert_eq!(backend.row_count(&NODE_SCHEMA).await, 1);
    }

    #[tokio::test]
    async fn test_replace_keeps_write_once_fields() {
        let backend = InMemoryBackend::new();
        let created = flare_core::now();
        backend
            .insert(&NODE_SCHEMA, &node("n1", "j").with(CREATED_AT_FIELD, created))
            .await
            .unwrap();

        let replacement = node("other", "j9");
        assert!(backend.replace(&NODE_SCHEMA, "n1", &replacement).await.unwrap());
        assert!(!backend.replace(&NODE_SCHEMA, "missing", &replacement).await.unwrap());

        let rows = backend.select(&NODE_SCHEMA, &Query::new()).await.unwrap();
        assert_eq!(rows[0].id(), Some("n1"));
        assert_eq!(rows[0].value_or_null(CREATED_AT_FIELD).as_timestamp(), Some(created));
        assert_eq!(rows[0].value_or_null("jobId").as_str(), Some("j9"));
    }
}
