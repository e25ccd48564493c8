//! Job, Node and Socket: typed structs and their schema descriptors.

use crate::error::{StorageError, ValidationError};
use crate::record::Record;
use crate::schema::{DefaultValue, EntitySchema, FieldDef, FieldType, CREATED_AT_FIELD, ID_FIELD};
use crate::{EntityId, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const ID: FieldDef = FieldDef::new(ID_FIELD, FieldType::String)
    .identifying()
    .with_default(DefaultValue::GeneratedId);

const CREATED_AT: FieldDef =
    FieldDef::new(CREATED_AT_FIELD, FieldType::Timestamp).with_default(DefaultValue::Now);

const COUNTER: DefaultValue = DefaultValue::Integer(0);

pub const JOB_SCHEMA: EntitySchema = EntitySchema {
    name: "Job",
    table: "jobs",
    fields: &[
        ID,
        CREATED_AT,
        FieldDef::new("userId", FieldType::String).required(),
        FieldDef::new("taskId", FieldType::String).required(),
        FieldDef::new("isRunning", FieldType::Boolean),
        FieldDef::new("passed", FieldType::Boolean),
    ],
};

pub const NODE_SCHEMA: EntitySchema = EntitySchema {
    name: "Node",
    table: "nodes",
    fields: &[
        ID,
        CREATED_AT,
        FieldDef::new("jobId", FieldType::String).required(),
        FieldDef::new("name", FieldType::String).required(),
        FieldDef::new("running", FieldType::Boolean).required(),
        FieldDef::new("totalSuccessfulConnections", FieldType::Integer).with_default(COUNTER),
        FieldDef::new("totalFailedConnections", FieldType::Integer).with_default(COUNTER),
        FieldDef::new("totalDroppedConnections", FieldType::Integer).with_default(COUNTER),
    ],
};

/// Sockets carry no creation timestamp. `jobId` is flagged identifying but
/// uniqueness is enforced on `id` alone.
pub const SOCKET_SCHEMA: EntitySchema = EntitySchema {
    name: "Socket",
    table: "sockets",
    fields: &[
        ID,
        FieldDef::new("jobId", FieldType::String).required().identifying(),
        FieldDef::new("connected", FieldType::Boolean),
        FieldDef::new("disconnected", FieldType::Boolean),
        FieldDef::new("hasError", FieldType::Boolean),
        FieldDef::new("connectionTime", FieldType::Timestamp),
        FieldDef::new("disconnectTime", FieldType::Timestamp),
        FieldDef::new("errorTime", FieldType::Timestamp),
        FieldDef::new("timeToConnection", FieldType::Number),
    ],
};

/// All descriptors, in migration order.
pub const ALL_SCHEMAS: [&EntitySchema; 3] = [&JOB_SCHEMA, &NODE_SCHEMA, &SOCKET_SCHEMA];

/// Binds a typed struct to its schema descriptor.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const SCHEMA: &'static EntitySchema;

    fn entity_id(&self) -> &str;

    /// Decode a complete stored record.
    fn from_record(record: &Record) -> Result<Self, StorageError> {
        serde_json::from_value(record.to_json()).map_err(|e| StorageError::Decode {
            entity: Self::SCHEMA.name.to_string(),
            reason: e.to_string(),
        })
    }

    fn to_record(&self) -> Result<Record, ValidationError> {
        let json = serde_json::to_value(self).map_err(|e| ValidationError::MalformedRecord {
            reason: e.to_string(),
        })?;
        Record::from_json(Self::SCHEMA, &json)
    }
}

/// One execution of a task on behalf of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Job {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    pub user_id: String,
    pub task_id: String,
    pub is_running: Option<bool>,
    pub passed: Option<bool>,
}

impl Entity for Job {
    const SCHEMA: &'static EntitySchema = &JOB_SCHEMA;

    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// A worker taking part in a job, with connection counters it maintains itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Node {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub job_id: EntityId,
    pub name: String,
    pub running: bool,
    pub total_successful_connections: i64,
    pub total_failed_connections: i64,
    pub total_dropped_connections: i64,
}

impl Entity for Node {
    const SCHEMA: &'static EntitySchema = &NODE_SCHEMA;

    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// One connection attempt made by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Socket {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub job_id: EntityId,
    pub connected: Option<bool>,
    pub disconnected: Option<bool>,
    pub has_error: Option<bool>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub connection_time: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub disconnect_time: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub error_time: Option<Timestamp>,
    pub time_to_connection: Option<f64>,
}

impl Entity for Socket {
    const SCHEMA: &'static EntitySchema = &SOCKET_SCHEMA;

    fn entity_id(&self) -> &str {
        &self.id
    }
}
