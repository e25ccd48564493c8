//! Typed entity services.
//!
//! An [`EntityService`] pairs one [`Entity`] type with an [`Adapter`] bound
//! to its schema. Operations that return a complete record decode it into
//! the typed struct; `find` stays untyped because a projection can narrow
//! the shape.

use flare_core::{
    Entity, FlareResult, Job, Node, Projection, Query, Record, Socket, Where,
};
use flare_storage::{Adapter, StorageBackend};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct EntityService<E: Entity> {
    adapter: Adapter,
    _entity: PhantomData<fn() -> E>,
}

pub type JobService = EntityService<Job>;
pub type NodeService = EntityService<Node>;
pub type SocketService = EntityService<Socket>;

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> std::fmt::Debug for EntityService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityService")
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            adapter: Adapter::new(E::SCHEMA, backend),
            _entity: PhantomData,
        }
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Create from an untyped record (the HTTP body path).
    pub async fn create(&self, record: Record) -> FlareResult<E> {
        let stored = self.adapter.create(record).await?;
        Ok(E::from_record(&stored)?)
    }

    /// Create from a typed value.
    pub async fn create_entity(&self, entity: &E) -> FlareResult<E> {
        self.create(entity.to_record()?).await
    }

    pub async fn find(&self, query: &Query) -> FlareResult<Vec<Record>> {
        self.adapter.find(query).await
    }

    /// Like `find`, decoding each row. Fails on projected queries that drop
    /// fields the struct needs.
    pub async fn find_entities(&self, query: &Query) -> FlareResult<Vec<E>> {
        self.adapter
            .find(query)
            .await?
            .iter()
            .map(|r| E::from_record(r).map_err(Into::into))
            .collect()
    }

    pub async fn count(&self, filter: Option<&Where>) -> FlareResult<u64> {
        self.adapter.count(filter).await
    }

    pub async fn find_by_id(&self, id: &str) -> FlareResult<E> {
        let record = self.adapter.find_by_id(id).await?;
        Ok(E::from_record(&record)?)
    }

    pub async fn find_record_by_id(
        &self,
        id: &str,
        fields: Option<Projection>,
    ) -> FlareResult<Record> {
        self.adapter.find_by_id_projected(id, fields).await
    }

    pub async fn exists(&self, id: &str) -> FlareResult<bool> {
        self.adapter.exists(id).await
    }

    pub async fn update_by_id(&self, id: &str, partial: Record) -> FlareResult<()> {
        self.adapter.update_by_id(id, partial).await
    }

    pub async fn update_all(&self, partial: Record, filter: Option<&Where>) -> FlareResult<u64> {
        self.adapter.update_all(partial, filter).await
    }

    pub async fn replace_by_id(&self, id: &str, full: Record) -> FlareResult<()> {
        self.adapter.replace_by_id(id, full).await
    }

    pub async fn delete_by_id(&self, id: &str) -> FlareResult<()> {
        self.adapter.delete_by_id(id).await
    }

    pub async fn delete_all(&self, filter: Option<&Where>) -> FlareResult<u64> {
        self.adapter.delete_all(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flare_core::FlareError;
    use flare_storage::InMemoryBackend;

    fn backend() -> Arc<dyn StorageBackend> {
        Arc::new(InMemoryBackend::new())
    }

    #[tokio::test]
    async fn test_create_returns_typed_entity_with_defaults() {
        let nodes = NodeService::new(backend());
        let node = nodes
            .create(
                Record::new()
                    .with("jobId", "j1")
                    .with("name", "node-a")
                    .with("running", true),
            )
            .await
            .unwrap();

        assert!(!node.id.is_empty());
        assert_eq!(node.total_successful_connections, 0);
        assert_eq!(node.total_failed_connections, 0);
        assert_eq!(node.total_dropped_connections, 0);

        let fetched = nodes.find_by_id(&node.id).await.unwrap();
        assert_eq!(fetched, node);
    }

    #[tokio::test]
    async fn test_services_share_one_backend() {
        let backend = backend();
        let jobs = JobService::new(backend.clone());
        let sockets = SocketService::new(backend);

        let job = jobs
            .create(Record::new().with("userId", "u").with("taskId", "t"))
            .await
            .unwrap();
        sockets
            .create(Record::new().with("jobId", job.id.as_str()).with("connected", true))
            .await
            .unwrap();

        assert_eq!(jobs.count(None).await.unwrap(), 1);
        let filter = Where::eq("jobId", job.id.as_str());
        assert_eq!(sockets.count(Some(&filter)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_entities_decodes_rows() {
        let jobs = JobService::new(backend());
        for task in ["a", "b"] {
            jobs.create(Record::new().with("userId", "u").with("taskId", task))
                .await
                .unwrap();
        }

        let found = jobs.find_entities(&Query::new()).await.unwrap();
        let tasks: Vec<_> = found.iter().map(|j| j.task_id.as_str()).collect();
        assert_eq!(tasks, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_create_entity_keeps_typed_identity() {
        let jobs = JobService::new(backend());
        let job = Job {
            id: "job-typed".to_string(),
            created_at: flare_core::parse_timestamp("2019-03-09T11:51:13Z").unwrap(),
            user_id: "u".to_string(),
            task_id: "t".to_string(),
            is_running: Some(true),
            passed: None,
        };

        let stored = jobs.create_entity(&job).await.unwrap();
        assert_eq!(stored, job);
        assert_eq!(jobs.find_by_id("job-typed").await.unwrap(), job);

        let err = jobs.create_entity(&job).await.unwrap_err();
        assert!(matches!(err, FlareError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let jobs = JobService::new(backend());
        let err = jobs.find_by_id("nope").await.unwrap_err();
        assert!(matches!(err, FlareError::NotFound { .. }));
        assert!(!jobs.exists("nope").await.unwrap());
    }
}
