//! FLARE Storage - Backend Trait, In-Memory Backend and Generic Adapter
//!
//! Defines the storage abstraction for flare entities. The PostgreSQL
//! backend lives in flare-api.

mod adapter;
mod backend;
mod memory;

pub use adapter::Adapter;
pub use backend::StorageBackend;
pub use memory::InMemoryBackend;

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
