//! Shared application state for Axum routers.

use std::sync::Arc;

use flare_storage::StorageBackend;

use crate::services::{JobService, NodeService, SocketService};

/// Application-wide state shared across all routes.
///
/// Every service holds a clone of the same backend handle.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn StorageBackend>,
    pub jobs: JobService,
    pub nodes: NodeService,
    pub sockets: SocketService,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            jobs: JobService::new(backend.clone()),
            nodes: NodeService::new(backend.clone()),
            sockets: SocketService::new(backend.clone()),
            backend,
            start_time: std::time::Instant::now(),
        }
    }
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref!(Arc<dyn StorageBackend>, backend);
crate::impl_from_ref!(JobService, jobs);
crate::impl_from_ref!(NodeService, nodes);
crate::impl_from_ref!(SocketService, sockets);
