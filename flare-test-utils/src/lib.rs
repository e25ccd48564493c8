//! flare Test Utilities
//!
//! Shared test infrastructure for the flare workspace:
//! - Proptest generators for entity records
//! - Fixtures for the scenarios the API is expected to serve
//! - Custom assertions over [`FlareResult`]

use std::sync::Arc;

// Re-export core types for convenience
pub use flare_core::{
    ConstraintError, Entity, EntitySchema, FieldValue, FlareError, FlareResult, Job, Node,
    Query, Record, Socket, StorageError, Timestamp, ValidationError, Where, JOB_SCHEMA,
    NODE_SCHEMA, SOCKET_SCHEMA,
};
pub use flare_storage::{Adapter, InMemoryBackend, StorageBackend};

/// A fresh, empty in-memory backend behind the trait object the services take.
pub fn memory_backend() -> Arc<dyn StorageBackend> {
    Arc::new(InMemoryBackend::new())
}

/// An adapter for `schema` over its own empty in-memory backend.
pub fn memory_adapter(schema: &'static EntitySchema) -> Adapter {
    Adapter::new(schema, memory_backend())
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for flare records.

    use super::*;
    use proptest::prelude::*;

    /// Caller-supplied style identifiers.
    pub fn arb_entity_id() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,15}"
    }

    /// Generate a Timestamp within 2019-2030, whole seconds.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1546300800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Job creation body (no id, no createdAt).
    pub fn arb_job_record() -> impl Strategy<Value = Record> {
        (
            "[a-z0-9]{1,8}",
            "[a-z0-9]{1,8}",
            proptest::option::of(any::<bool>()),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(user, task, running, passed)| {
                let mut record = Record::new().with("userId", user).with("taskId", task);
                if let Some(running) = running {
                    record.insert("isRunning", running);
                }
                if let Some(passed) = passed {
                    record.insert("passed", passed);
                }
                record
            })
    }

    /// Node creation body under `job_id`, counters left to their defaults.
    pub fn arb_node_record(job_id: String) -> impl Strategy<Value = Record> {
        ("[a-z]{1,8}", any::<bool>()).prop_map(move |(name, running)| {
            Record::new()
                .with("jobId", job_id.as_str())
                .with("name", name)
                .with("running", running)
        })
    }

    /// Socket creation body under `job_id`.
    pub fn arb_socket_record(job_id: String) -> impl Strategy<Value = Record> {
        (
            any::<bool>(),
            proptest::option::of(arb_timestamp()),
            proptest::option::of(0.0f64..5000.0),
        )
            .prop_map(move |(connected, at, latency)| {
                let mut record = Record::new()
                    .with("jobId", job_id.as_str())
                    .with("connected", connected);
                if let Some(at) = at {
                    record.insert("connectionTime", at);
                }
                if let Some(latency) = latency {
                    record.insert("timeToConnection", latency);
                }
                record
            })
    }

    /// Connection counter values a node could report.
    pub fn arb_counter() -> impl Strategy<Value = i64> {
        0i64..100_000
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common testing scenarios.

    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value as JsonValue};

    /// jobId shared by the time-window sockets.
    pub const TIME_JOB: &str = "time";

    /// 2019-03-09 11:51:`second` UTC.
    pub fn at_second(second: u32) -> Timestamp {
        chrono::Utc
            .with_ymd_and_hms(2019, 3, 9, 11, 51, second)
            .single()
            .unwrap_or_else(chrono::Utc::now)
    }

    /// Minimal job creation body.
    pub fn job_body() -> JsonValue {
        json!({"userId": "user1", "taskId": "task1"})
    }

    /// Minimal node creation body.
    pub fn node_body(job_id: &str, name: &str) -> JsonValue {
        json!({"jobId": job_id, "name": name, "running": true})
    }

    /// Minimal socket creation body.
    pub fn socket_body(job_id: &str) -> JsonValue {
        json!({"jobId": job_id, "connected": true})
    }

    /// Two nodes under `node1`, two under `node2`.
    pub fn node_pair_scenario() -> Vec<JsonValue> {
        vec![
            node_body("node1", "test-node-1"),
            node_body("node1", "test-node-2"),
            node_body("node2", "test-node-3"),
            node_body("node2", "test-node-4"),
        ]
    }

    /// Seconds of the six connected sockets under [`TIME_JOB`].
    pub const TIME_WINDOW_SECONDS: [u32; 6] = [13, 15, 18, 21, 23, 24];

    /// Six connected sockets under [`TIME_JOB`] between 11:51:13 and
    /// 11:51:24, one socket under another job and one that never connected.
    pub fn time_window_sockets() -> Vec<JsonValue> {
        let mut bodies: Vec<JsonValue> = TIME_WINDOW_SECONDS
            .iter()
            .map(|s| {
                json!({
                    "jobId": TIME_JOB,
                    "connected": true,
                    "connectionTime": at_second(*s).to_rfc3339(),
                })
            })
            .collect();
        bodies.push(json!({
            "jobId": "other",
            "connected": true,
            "connectionTime": at_second(14).to_rfc3339(),
        }));
        bodies.push(json!({
            "jobId": TIME_JOB,
            "connected": false,
            "connectionTime": at_second(16).to_rfc3339(),
        }));
        bodies
    }

    /// Where expression counting connected [`TIME_JOB`] sockets in `[from, to]`.
    pub fn time_window_where(from: u32, to: u32) -> JsonValue {
        json!({
            "connectionTime": {"between": [at_second(from).to_rfc3339(), at_second(to).to_rfc3339()]},
            "connected": true,
            "jobId": TIME_JOB,
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over flare results.

    use super::*;

    /// Assert that a FlareResult is a NotFound error for `entity`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &FlareResult<T>, entity: &str) {
        match result {
            Err(FlareError::NotFound { entity: e, .. }) => {
                assert_eq!(e, entity, "Wrong entity in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", entity, other),
        }
    }

    /// Assert that a FlareResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &FlareResult<T>) {
        match result {
            Err(FlareError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a FlareResult is a RequiredFieldMissing error for `field`.
    #[track_caller]
    pub fn assert_required_missing<T: std::fmt::Debug>(result: &FlareResult<T>, field: &str) {
        match result {
            Err(FlareError::Constraint(ConstraintError::RequiredFieldMissing { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in RequiredFieldMissing error");
            }
            other => panic!("Expected RequiredFieldMissing({}), got: {:?}", field, other),
        }
    }

    /// Assert that a FlareResult is a DuplicateId error for `id`.
    #[track_caller]
    pub fn assert_duplicate_id<T: std::fmt::Debug>(result: &FlareResult<T>, id: &str) {
        match result {
            Err(FlareError::Constraint(ConstraintError::DuplicateId { id: i, .. })) => {
                assert_eq!(i, id, "Wrong id in DuplicateId error");
            }
            other => panic!("Expected DuplicateId({}), got: {:?}", id, other),
        }
    }
}
